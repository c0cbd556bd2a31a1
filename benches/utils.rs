use rand::{Rng, SeedableRng, rngs::StdRng};

/// Generate n random bmake units to use in the benchmark
pub fn generate_random_units(n: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(42); // Fixed seed for reproducibility
    (0..n).map(|_| random_unit(&mut rng)).collect()
}

fn random_unit(rng: &mut StdRng) -> String {
    let mut unit = String::from("# generated\nROOT = /src\n");
    let mut names = vec![String::from("ROOT")];

    let statements = rng.random_range(20..60);
    for _ in 0..statements {
        let name = random_name(rng);
        let reference = &names[rng.random_range(0..names.len())];
        match rng.random_range(0..6) {
            0 => unit.push_str(&format!("{} = $({})/{}\n", name, reference, random_name(rng))),
            1 => unit.push_str(&format!("{} + -D{}\n", reference, name)),
            2 => unit.push_str(&format!("{} =% $[{}]\n", name, reference)),
            3 => unit.push_str(&format!(
                "%if defined({}) && $({}) == \"{}\"\n{} = on\n%else\n{} = off\n%endif\n",
                reference, reference, name, name, name
            )),
            4 => unit.push_str(&format!(
                "always:\n    |Building {}\n    -@cc -c ${{{}}}/{}.c\n",
                name, reference, name
            )),
            _ => unit.push_str(&format!("%message {} is $({})\n", reference, reference)),
        }
        names.push(name);
    }
    unit
}

/// Generate a random upper case name
fn random_name(rng: &mut StdRng) -> String {
    let charset = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let len = rng.random_range(3..=8);
    (0..len)
        .map(|_| char::from(charset[rng.random_range(0..charset.len())]))
        .collect()
}
