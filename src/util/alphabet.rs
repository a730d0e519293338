use crate::config::AlphabetType;

pub const NUCLEOTIDE_LETTERS: &[u8; 4] = b"ACGT";
pub const AMINO_LETTERS: &[u8; 20] = b"ACDEFGHIKLMNPQRSTVWY";

/// 非字母字符统一记为歧义符（编码 = cardinality）。
const AMBIGUOUS: u8 = u8::MAX;

const fn build_table(letters: &[u8]) -> [u8; 256] {
    let mut table = [AMBIGUOUS; 256];
    let mut i = 0;
    while i < letters.len() {
        let up = letters[i];
        table[up as usize] = i as u8;
        table[up.to_ascii_lowercase() as usize] = i as u8;
        i += 1;
    }
    table
}

const NUCLEOTIDE_TABLE: [u8; 256] = {
    let mut t = build_table(NUCLEOTIDE_LETTERS);
    // U 与 T 共用编码
    t[b'U' as usize] = 3;
    t[b'u' as usize] = 3;
    t
};
const AMINO_TABLE: [u8; 256] = build_table(AMINO_LETTERS);

/// 歧义符编码。
#[inline]
pub fn ambiguity_code(alphabet: AlphabetType) -> u8 {
    alphabet.cardinality() as u8
}

/// 哨兵编码（只出现在 BWT 中，不参与查询）。
#[inline]
pub fn sentinel_code(alphabet: AlphabetType) -> u8 {
    alphabet.cardinality() as u8 + 1
}

/// 字符 -> 编码：字母为 [0, cardinality)，其余为歧义符。
#[inline]
pub fn encode(alphabet: AlphabetType, b: u8) -> u8 {
    let table = match alphabet {
        AlphabetType::Amino => &AMINO_TABLE,
        AlphabetType::Dna | AlphabetType::Rna => &NUCLEOTIDE_TABLE,
    };
    match table[b as usize] {
        AMBIGUOUS => ambiguity_code(alphabet),
        code => code,
    }
}

#[inline]
pub fn decode(alphabet: AlphabetType, code: u8) -> u8 {
    let card = alphabet.cardinality() as u8;
    match alphabet {
        _ if code == card + 1 => b'$',
        AlphabetType::Amino if code < card => AMINO_LETTERS[code as usize],
        AlphabetType::Amino => b'X',
        AlphabetType::Rna if code == 3 => b'U',
        _ if code < card => NUCLEOTIDE_LETTERS[code as usize],
        _ => b'N',
    }
}

#[inline]
pub fn is_letter(alphabet: AlphabetType, code: u8) -> bool {
    (code as usize) < alphabet.cardinality()
}

/// 后缀排序用的键：哨兵 < 字母 < 歧义符。
#[inline]
pub fn sort_key(alphabet: AlphabetType, code: u8) -> u8 {
    if code == sentinel_code(alphabet) { 0 } else { code + 1 }
}

pub fn encode_seq(alphabet: AlphabetType, seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| encode(alphabet, b)).collect()
}

/// 编码查询串；含任何非字母字符时返回 None（歧义符不可检索）。
pub fn encode_query(alphabet: AlphabetType, query: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(query.len());
    for &b in query {
        let code = encode(alphabet, b);
        if !is_letter(alphabet, code) {
            return None;
        }
        out.push(code);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nucleotide_roundtrip_and_case_folding() {
        for (i, &b) in NUCLEOTIDE_LETTERS.iter().enumerate() {
            assert_eq!(encode(AlphabetType::Dna, b), i as u8);
            assert_eq!(encode(AlphabetType::Dna, b.to_ascii_lowercase()), i as u8);
            assert_eq!(decode(AlphabetType::Dna, i as u8), b);
        }
        assert_eq!(encode(AlphabetType::Rna, b'U'), 3);
        assert_eq!(decode(AlphabetType::Rna, 3), b'U');
    }

    #[test]
    fn unknown_bytes_are_ambiguous() {
        assert_eq!(encode(AlphabetType::Dna, b'N'), 4);
        assert_eq!(encode(AlphabetType::Dna, b'-'), 4);
        assert_eq!(encode(AlphabetType::Amino, b'X'), 20);
        assert_eq!(encode(AlphabetType::Amino, b'B'), 20);
        assert_eq!(decode(AlphabetType::Amino, 20), b'X');
    }

    #[test]
    fn amino_letters_are_dense() {
        for (i, &b) in AMINO_LETTERS.iter().enumerate() {
            assert_eq!(encode(AlphabetType::Amino, b), i as u8);
        }
    }

    #[test]
    fn sentinel_sorts_first_and_ambiguity_last() {
        let dna = AlphabetType::Dna;
        assert_eq!(sort_key(dna, sentinel_code(dna)), 0);
        assert!(sort_key(dna, 0) > 0);
        assert!(sort_key(dna, ambiguity_code(dna)) > sort_key(dna, 3));
    }

    #[test]
    fn queries_with_ambiguity_are_rejected() {
        assert_eq!(encode_query(AlphabetType::Dna, b"acgt"), Some(vec![0, 1, 2, 3]));
        assert_eq!(encode_query(AlphabetType::Dna, b"ACNT"), None);
    }
}
