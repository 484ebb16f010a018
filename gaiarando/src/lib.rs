// Index loops over parallel Vecs read better than zipped iterators here.
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]

pub mod helpers;
pub mod randomize;
pub mod settings;
pub mod spoiler_log;
pub mod traverse;

#[cfg(test)]
mod test_worlds;
