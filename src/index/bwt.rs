/// 根据后缀数组构建 BWT，同时返回哨兵所在的 BWT 行。
/// text 为符号编码（末尾为哨兵编码），sa 为后缀数组位置。
pub fn build_bwt(text: &[u8], sa: &[u64]) -> (Vec<u8>, u64) {
    let n = text.len();
    if n == 0 {
        return (Vec::new(), 0);
    }
    let mut bwt = Vec::with_capacity(n);
    let mut sentinel_row = 0u64;
    for (row, &p) in sa.iter().enumerate() {
        let i = p as usize;
        let prev = if i == 0 {
            sentinel_row = row as u64;
            text[n - 1]
        } else {
            text[i - 1]
        };
        bwt.push(prev);
    }
    (bwt, sentinel_row)
}
