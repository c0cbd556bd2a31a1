#![allow(dead_code, reason = "Not every test binary uses every fixture.")]

use rand::Rng;
use zigify::{BmakeParser, MemoryLoader, Options, Transpiler};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A transpiler reading includes from `loader` that emits bare statements.
pub fn get_transpiler(loader: MemoryLoader) -> Transpiler<BmakeParser, MemoryLoader> {
    init_logging();
    Transpiler::with_parts(BmakeParser, loader, Options::new().with_prelude(false))
}

pub fn get_bare_transpiler() -> Transpiler<BmakeParser, MemoryLoader> {
    get_transpiler(MemoryLoader::new())
}

pub fn generate_random_whitespace() -> String {
    let mut rng = rand::rng();
    let length = rng.random_range(0..10);
    (0..length)
        .map(|_| if rng.random_bool(0.5) { ' ' } else { '\t' })
        .collect()
}

pub fn generate_random_whitespace_at_least_one() -> String {
    let mut rng = rand::rng();
    let length = rng.random_range(1..10);
    (0..length).map(|_| ' ').collect()
}
