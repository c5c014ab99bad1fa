pub mod netlib;
