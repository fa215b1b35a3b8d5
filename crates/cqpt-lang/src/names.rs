use smol_str::SmolStr;

pub const TOKEN_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";
pub const QUERY_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Endless sequence of distinct names over `alphabet`: `a, b, …, z, aa, ab, …`.
pub fn from_alphabet(alphabet: &'static str) -> impl Iterator<Item = SmolStr> {
    let symbols = alphabet.chars().collect::<Vec<_>>();
    (1usize..).flat_map(move |n| {
        let symbols = symbols.clone();
        (0..symbols.len().pow(n as u32)).map(move |mut i| {
            let mut name = vec![symbols[0]; n];
            for slot in name.iter_mut().rev() {
                *slot = symbols[i % symbols.len()];
                i /= symbols.len();
            }
            name.into_iter().collect::<SmolStr>()
        })
    })
}
