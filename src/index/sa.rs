/// 构建后缀数组（基于倍增法，O(n log² n) 排序）。
/// 输入为排序键序列（见 `alphabet::sort_key`：0 为哨兵，且仅出现在末尾）。
pub fn build_sa(text: &[u8]) -> Vec<u64> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sa: Vec<usize> = (0..n).collect();
    let mut rank: Vec<usize> = text.iter().map(|&b| b as usize).collect();
    let mut tmp: Vec<usize> = vec![0; n];

    let mut k = 1usize;
    loop {
        // 越界的后半段记为 0，其余整体 +1，保证短后缀排在前面
        let second = |rank: &[usize], i: usize| if i + k < n { rank[i + k] + 1 } else { 0 };

        sa.sort_unstable_by(|&i, &j| {
            rank[i].cmp(&rank[j]).then_with(|| second(&rank, i).cmp(&second(&rank, j)))
        });

        tmp[sa[0]] = 0;
        for w in 1..n {
            let a = sa[w - 1];
            let b = sa[w];
            let prev = (rank[a], second(&rank, a));
            let curr = (rank[b], second(&rank, b));
            tmp[b] = tmp[a] + usize::from(curr != prev);
        }

        // 复制回 rank
        rank.copy_from_slice(&tmp);
        if rank[sa[n - 1]] == n - 1 || k >= n {
            break;
        }
        k <<= 1;
    }

    sa.into_iter().map(|x| x as u64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_sa(text: &[u8]) -> Vec<u64> {
        let n = text.len();
        let mut suffixes: Vec<(usize, &[u8])> = (0..n).map(|i| (i, &text[i..])).collect();
        suffixes.sort_by(|a, b| a.1.cmp(b.1));
        suffixes.into_iter().map(|(i, _)| i as u64).collect()
    }

    fn make_text(len: usize) -> Vec<u8> {
        let mut x: u32 = 1_234_567;
        let mut v = Vec::with_capacity(len + 1);
        for _ in 0..len {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            v.push(1 + (x >> 16) as u8 % 5);
        }
        v.push(0);
        v
    }

    #[test]
    fn sa_basic() {
        // 文本：A C G T $  -> 1 2 3 4 0
        let text = [1u8, 2, 3, 4, 0];
        let sa = build_sa(&text);
        // 期望：后缀按字典序：$, A$, C$, G$, T$
        assert_eq!(sa, vec![4, 0, 1, 2, 3]);
    }

    #[test]
    fn sa_matches_naive_on_small_random_texts() {
        for len in 0..=40 {
            let text = make_text(len);
            assert_eq!(build_sa(&text), naive_sa(&text), "mismatch on len={}", len);
        }
    }

    #[test]
    fn sa_handles_long_repeats() {
        let mut text = vec![1u8; 64];
        text.push(0);
        assert_eq!(build_sa(&text), naive_sa(&text));
    }

    #[test]
    fn sa_empty() {
        assert!(build_sa(&[]).is_empty());
    }
}
