//! 压缩（稀疏采样）后缀数组。
//!
//! 只保留 BWT 行号为 ratio 整数倍的 SA 值，按 `value_bit_width` 位紧凑打包
//! （小端、低位在前）。未采样的行通过 LF 映射回溯到采样行后再补偿步数。

use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use crate::{Error, Result};

/// 采样值的存放位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleStorage {
    /// 常驻内存的打包字节
    Resident(Vec<u8>),
    /// 位于索引文件 `offset` 处，查询时按需读取
    OnDisk { path: PathBuf, offset: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedSuffixArray {
    value_bit_width: u8,
    compression_ratio: u8,
    len: u64,
    storage: SampleStorage,
}

/// 打包 len 个 width 位的值所需字节数。
pub fn packed_byte_len(len: u64, width: u8) -> u64 {
    (len * u64::from(width) + 7) / 8
}

/// 表示 [0, max_value] 所需的位数，至少 1 位。
pub fn bit_width_for(max_value: u64) -> u8 {
    (64 - max_value.leading_zeros()).max(1) as u8
}

#[inline]
fn value_mask(width: u8) -> u64 {
    if width >= 64 { u64::MAX } else { (1u64 << width) - 1 }
}

fn write_bits(bytes: &mut [u8], bit_offset: u64, width: u8, value: u64) {
    let start = (bit_offset / 8) as usize;
    let shift = bit_offset % 8;
    let shifted = u128::from(value & value_mask(width)) << shift;
    let span = ((shift + u64::from(width) + 7) / 8) as usize;
    for (i, byte) in bytes[start..start + span].iter_mut().enumerate() {
        *byte |= (shifted >> (8 * i)) as u8;
    }
}

/// 从 bytes 的第 bit_offset 位起读出 width 位（width <= 64，最多跨 9 字节）。
fn read_bits(bytes: &[u8], bit_offset: u64, width: u8) -> u64 {
    let start = (bit_offset / 8) as usize;
    let shift = (bit_offset % 8) as u32;
    let acc = bytes[start..]
        .iter()
        .take(9)
        .enumerate()
        .fold(0u128, |acc, (i, &b)| acc | (u128::from(b) << (8 * i)));
    ((acc >> shift) as u64) & value_mask(width)
}

impl CompressedSuffixArray {
    /// 从完整 SA 中按 ratio 采样并打包。
    pub fn build(sa: &[u64], compression_ratio: u8) -> Result<Self> {
        if compression_ratio == 0 {
            return Err(Error::InvalidConfiguration(
                "suffix array compression ratio must be at least 1".into(),
            ));
        }
        let n = sa.len() as u64;
        let ratio = u64::from(compression_ratio);
        let len = (n + ratio - 1) / ratio;
        let width = bit_width_for(n.saturating_sub(1));

        let mut bytes = Vec::new();
        bytes.try_reserve_exact(packed_byte_len(len, width) as usize)?;
        bytes.resize(packed_byte_len(len, width) as usize, 0u8);
        for (slot, &value) in sa.iter().step_by(compression_ratio as usize).enumerate() {
            write_bits(&mut bytes, slot as u64 * u64::from(width), width, value);
        }

        Ok(Self {
            value_bit_width: width,
            compression_ratio,
            len,
            storage: SampleStorage::Resident(bytes),
        })
    }

    pub fn from_parts(value_bit_width: u8, compression_ratio: u8, len: u64, storage: SampleStorage) -> Result<Self> {
        if value_bit_width == 0 || value_bit_width > 64 || compression_ratio == 0 {
            return Err(Error::FileFormat(format!(
                "invalid suffix array parameters (width {}, ratio {})",
                value_bit_width, compression_ratio
            )));
        }
        if let SampleStorage::Resident(bytes) = &storage {
            if bytes.len() as u64 != packed_byte_len(len, value_bit_width) {
                return Err(Error::FileFormat("suffix array byte length mismatch".into()));
            }
        }
        Ok(Self { value_bit_width, compression_ratio, len, storage })
    }

    #[inline]
    pub fn value_bit_width(&self) -> u8 {
        self.value_bit_width
    }

    #[inline]
    pub fn compression_ratio(&self) -> u8 {
        self.compression_ratio
    }

    /// 采样值个数 = ceil(bwt_length / ratio)。
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn byte_len(&self) -> u64 {
        packed_byte_len(self.len, self.value_bit_width)
    }

    pub fn is_resident(&self) -> bool {
        matches!(self.storage, SampleStorage::Resident(_))
    }

    pub fn storage(&self) -> &SampleStorage {
        &self.storage
    }

    /// BWT 行 row 是否为采样行；是则返回槽位号。
    #[inline]
    pub fn sampled_slot(&self, row: u64) -> Option<u64> {
        let ratio = u64::from(self.compression_ratio);
        (row % ratio == 0).then(|| row / ratio)
    }

    /// 打开采样值读取器。磁盘模式下文件句柄归读取器所有，随其释放。
    pub fn reader(&self) -> Result<SampleReader<'_>> {
        let file = match &self.storage {
            SampleStorage::Resident(_) => None,
            SampleStorage::OnDisk { path, .. } => Some(
                File::open(path).map_err(|e| Error::from_open(path, e))?,
            ),
        };
        Ok(SampleReader { csa: self, file })
    }

    /// 全部打包字节（磁盘模式下从文件读出）。
    pub fn packed_bytes(&self) -> Result<Cow<'_, [u8]>> {
        match &self.storage {
            SampleStorage::Resident(bytes) => Ok(Cow::Borrowed(bytes)),
            SampleStorage::OnDisk { path, offset } => {
                let mut file = File::open(path).map_err(|e| Error::from_open(path, e))?;
                file.seek(SeekFrom::Start(*offset))?;
                let mut bytes = Vec::new();
                bytes.try_reserve_exact(self.byte_len() as usize)?;
                bytes.resize(self.byte_len() as usize, 0);
                file.read_exact(&mut bytes)?;
                Ok(Cow::Owned(bytes))
            }
        }
    }
}

/// 采样值读取器。
pub struct SampleReader<'a> {
    csa: &'a CompressedSuffixArray,
    file: Option<File>,
}

impl SampleReader<'_> {
    /// 第 slot 个采样值。
    pub fn value(&mut self, slot: u64) -> Result<u64> {
        let csa = self.csa;
        if slot >= csa.len {
            return Err(Error::IllegalPosition(format!(
                "suffix array slot {} out of range (length {})",
                slot, csa.len
            )));
        }
        let width = csa.value_bit_width;
        let bit_offset = slot * u64::from(width);
        match (&csa.storage, self.file.as_mut()) {
            (SampleStorage::Resident(bytes), _) => Ok(read_bits(bytes, bit_offset, width)),
            (SampleStorage::OnDisk { offset, .. }, Some(file)) => {
                let first = bit_offset / 8;
                let last = (bit_offset + u64::from(width) + 7) / 8;
                let span = (last - first) as usize;
                let mut buf = [0u8; 9];
                file.seek(SeekFrom::Start(offset + first))?;
                file.read_exact(&mut buf[..span])?;
                Ok(read_bits(&buf[..span], bit_offset % 8, width))
            }
            (SampleStorage::OnDisk { path, .. }, None) => Err(Error::FileNotFound(path.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn bit_width_covers_max_value() {
        assert_eq!(bit_width_for(0), 1);
        assert_eq!(bit_width_for(1), 1);
        assert_eq!(bit_width_for(2), 2);
        assert_eq!(bit_width_for(255), 8);
        assert_eq!(bit_width_for(256), 9);
        assert_eq!(bit_width_for(u64::MAX), 64);
    }

    #[test]
    fn packing_handles_unaligned_and_wide_values() {
        for &width in &[1u8, 3, 7, 13, 33, 57, 64] {
            let values: Vec<u64> = (0..50u64)
                .map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15) & value_mask(width))
                .collect();
            let mut bytes = vec![0u8; packed_byte_len(values.len() as u64, width) as usize];
            for (i, &v) in values.iter().enumerate() {
                write_bits(&mut bytes, i as u64 * u64::from(width), width, v);
            }
            for (i, &v) in values.iter().enumerate() {
                assert_eq!(read_bits(&bytes, i as u64 * u64::from(width), width), v, "width={}", width);
            }
        }
    }

    #[test]
    fn samples_every_ratio_th_row() {
        let sa: Vec<u64> = vec![15, 14, 10, 0, 12, 4, 8, 1, 11, 5, 9, 2, 13, 6, 3, 7];
        let csa = CompressedSuffixArray::build(&sa, 3).unwrap();
        assert_eq!(csa.len(), 6);
        assert_eq!(csa.value_bit_width(), 4);
        assert_eq!(csa.sampled_slot(6), Some(2));
        assert_eq!(csa.sampled_slot(7), None);
        let mut reader = csa.reader().unwrap();
        for (slot, row) in (0..sa.len()).step_by(3).enumerate() {
            assert_eq!(reader.value(slot as u64).unwrap(), sa[row]);
        }
        assert!(matches!(reader.value(6), Err(Error::IllegalPosition(_))));
    }

    #[test]
    fn on_disk_samples_match_resident() {
        let sa: Vec<u64> = (0..1000u64).map(|i| (i * 7919) % 1000).collect();
        let resident = CompressedSuffixArray::build(&sa, 5).unwrap();
        let bytes = resident.packed_bytes().unwrap().into_owned();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"header..").unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let on_disk = CompressedSuffixArray::from_parts(
            resident.value_bit_width(),
            5,
            resident.len(),
            SampleStorage::OnDisk { path: file.path().to_path_buf(), offset: 8 },
        )
        .unwrap();
        assert!(!on_disk.is_resident());
        assert_eq!(on_disk.packed_bytes().unwrap().as_ref(), &bytes[..]);

        let mut a = resident.reader().unwrap();
        let mut b = on_disk.reader().unwrap();
        for slot in 0..resident.len() {
            assert_eq!(a.value(slot).unwrap(), b.value(slot).unwrap());
        }
    }

    #[test]
    fn missing_sample_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let csa = CompressedSuffixArray::from_parts(
            4,
            2,
            3,
            SampleStorage::OnDisk { path: dir.path().join("gone.sfm"), offset: 0 },
        )
        .unwrap();
        assert!(matches!(csa.reader(), Err(Error::FileNotFound(_))));
        assert!(matches!(csa.packed_bytes(), Err(Error::FileNotFound(_))));
    }
}
