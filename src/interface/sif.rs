//! Conversion from SIF-format models (as parsed by [`sif_rs`]) into the
//! internal [`LinearProgram`] representation used by the solver.
//!
//! Unlike the MPS-era conversion this used to share a code path with,
//! constraint rows are carried with their native sense (`<=`, `=`, `>=`)
//! rather than pre-augmented with slack columns — the simplex core
//! introduces slacks itself during setup.

use faer::Col;
use faer::sparse::{SparseColMat, Triplet};
use problemo::Problem;
use sif_rs::SIF;

use crate::lp::{LinearProgram, Sense};
use crate::{E, I};

pub trait TryFromSIF {
    type Output;
    fn try_from_sif(sif: &SIF) -> Result<Self::Output, Problem>;
}

impl TryFromSIF for LinearProgram {
    type Output = Self;

    fn try_from_sif(sif: &SIF) -> Result<Self::Output, Problem> {
        let data = parse_sif(sif)?;
        Ok(Self::new(data.c, data.A, data.b, data.senses, data.l, data.u))
    }
}

#[allow(non_snake_case)]
struct SifData {
    c: Col<E>,
    A: SparseColMat<I, E>,
    b: Col<E>,
    senses: Vec<Sense>,
    l: Col<E>,
    u: Col<E>,
}

fn parse_sif(sif: &SIF) -> Result<SifData, Problem> {
    // Map variable and constraint names to their respective internal indices.
    // BTreeSet/BTreeMap gives deterministic ordering regardless of parse order.
    let map_var_idx: std::collections::BTreeMap<_, _> = sif
        .get_cols()
        .into_iter()
        .map(|(var_name, _)| var_name.clone())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(i, var_name)| (var_name, i))
        .collect();
    let map_con_idx: std::collections::BTreeMap<_, _> = sif
        .get_rows()
        .into_iter()
        .filter(|(_, row_type)| row_type != &&sif_rs::types::RowType::N)
        .map(|(con_name, _)| con_name.clone())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(i, con_name)| (con_name, i))
        .collect();

    let (n_var, n_con) = (map_var_idx.len(), map_con_idx.len());

    // Construct the objective function.
    let mut c = Col::zeros(n_var);
    sif.get_entries()
        .iter()
        .filter(|((con, _var), _)| sif.get_rows().get(con) == Some(&&sif_rs::types::RowType::N))
        .for_each(|((_con, var), &val)| {
            let j = map_var_idx[var];
            c[j] = E::from(val);
        });

    // Construct the right-hand side vector.
    let b = sif
        .get_rhs()
        .into_iter()
        .filter(|(con, _val)| sif.get_rows().get(*con) != Some(&&sif_rs::types::RowType::N))
        .map(|(con, val)| (map_con_idx[con], val))
        .fold(Col::zeros(n_con), |mut b, (i, val)| {
            b[i] = E::from(*val);
            b
        });

    // One sense per constraint row, ordered by `map_con_idx`.
    let mut senses = vec![Sense::Eq; n_con];
    for (con_name, &i) in map_con_idx.iter() {
        senses[i] = match sif.get_rows()[con_name] {
            sif_rs::types::RowType::L => Sense::Le,
            sif_rs::types::RowType::G => Sense::Ge,
            sif_rs::types::RowType::E => Sense::Eq,
            row_type => panic!("Unsupported row type: {:?}", row_type),
        };
    }

    let a_triplets = sif
        .get_entries()
        .iter()
        .filter(|((con, _var), val)| {
            if **val == 0. {
                return false;
            }
            sif.get_rows().get(con) != Some(&&sif_rs::types::RowType::N)
        })
        .map(|(i, &val)| {
            let (i, j) = (map_con_idx[&i.0], map_var_idx[&i.1]);
            Triplet::new(I::from(i), I::from(j), E::from(val))
        })
        .collect::<Vec<_>>();

    // Construct bounds. Default is `0 <= x_j < +inf`, matching MPS/SIF convention.
    let mut l = Col::<E>::zeros(n_var);
    let mut u = E::INFINITY * Col::<E>::ones(n_var);
    sif.get_bounds()
        .into_iter()
        .for_each(|(var_name, (bound_type, val))| {
            let j = map_var_idx[var_name];

            match bound_type {
                sif_rs::types::BoundType::Lo => {
                    l[j] = E::from(*val);
                }
                sif_rs::types::BoundType::Up => {
                    u[j] = E::from(*val);
                }
                sif_rs::types::BoundType::Fr => {
                    l[j] = -E::INFINITY;
                    u[j] = E::INFINITY;
                }
                sif_rs::types::BoundType::Mi => {
                    l[j] = -E::INFINITY;
                    u[j] = E::from(0.);
                }
                sif_rs::types::BoundType::Pl => {
                    l[j] = E::from(0.);
                    u[j] = E::INFINITY;
                }
                sif_rs::types::BoundType::Fx => {
                    // Simplex only needs l <= x <= u, not a strictly-feasible
                    // starting iterate, so a fixed variable can be exact.
                    l[j] = E::from(*val);
                    u[j] = E::from(*val);
                }
                bound_type => panic!("Unsupported bound type: {:?}", bound_type),
            }
        });

    let A = SparseColMat::try_new_from_triplets(n_con, n_var, a_triplets.as_slice())
        .map_err(|_| Problem::from(crate::lp::simplex::error::SimplexError::InvalidInput))?;

    Ok(SifData { c, A, b, senses, l, u })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sif_trivial() {
        // Exercised indirectly through the simplex integration tests; this
        // module's own unit surface is the RowType/BoundType mapping above,
        // which has no meaningful behavior to assert without a real SIF file.
    }
}
