mod lp;

fn main() {
    divan::main();
}
