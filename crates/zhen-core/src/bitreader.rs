//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从字节切片中逐位读取, 供 H.264 SPS 等位粒度语法使用.
//! 读取范围严格限制在构造时给定的切片内, 越界返回 [`ZhenError::BitstreamOverrun`].
//!
//! # Exp-Golomb 编码
//!
//! - `ue(v)`: 数出前导零个数 k, 遇到 1 后再读 k 位 r, 值为 `(1 << k | r) - 1`
//! - `se(v)`: 先按 ue(v) 解出 v, 奇数映射为 `(v + 1) >> 1`, 偶数映射为 `-(v >> 1)`

use crate::{ZhenError, ZhenResult};

/// ue(v) 允许的最大前导零个数
const MAX_UEG_LEADING_ZEROS: u32 = 31;

/// 比特流读取器
///
/// # 示例
/// ```
/// use zhen_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.read_bits(4).unwrap(), 0b0001);
/// assert_eq!(br.read_bits(8).unwrap(), 0b01010101);
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前字节索引
    byte_pos: usize,
    /// 当前字节中的位位置 (0-7, 0 表示最高位)
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        if self.byte_pos >= self.data.len() {
            return 0;
        }
        (self.data.len() - self.byte_pos) * 8 - self.bit_pos as usize
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.bits_left() == 0
    }

    /// 获取当前字节位置
    pub fn byte_position(&self) -> usize {
        self.byte_pos
    }

    fn ensure(&self, requested: usize) -> ZhenResult<()> {
        let available = self.bits_left();
        if requested > available {
            return Err(ZhenError::BitstreamOverrun {
                requested,
                available,
            });
        }
        Ok(())
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> ZhenResult<u32> {
        self.ensure(1)?;

        let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos >= 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(u32::from(bit))
    }

    /// 读取 1 位标志
    pub fn read_flag(&mut self) -> ZhenResult<bool> {
        Ok(self.read_bit()? == 1)
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 由逐位读取组合而成, 返回值的低 N 位有效. 剩余位数不足时不移动位置.
    pub fn read_bits(&mut self, n: u32) -> ZhenResult<u32> {
        if n > 32 {
            return Err(ZhenError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        self.ensure(n as usize)?;

        let mut result: u64 = 0;
        for _ in 0..n {
            result = (result << 1) | u64::from(self.read_bit()?);
        }
        Ok(result as u32)
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> ZhenResult<()> {
        self.ensure(n)?;

        let total_bits = self.bit_pos as usize + n;
        self.byte_pos += total_bits / 8;
        self.bit_pos = (total_bits % 8) as u8;

        Ok(())
    }

    /// 读取无符号 Exp-Golomb 编码值 ue(v)
    pub fn read_ueg(&mut self) -> ZhenResult<u32> {
        let mut leading_zeros = 0u32;
        while self.read_bit()? == 0 {
            leading_zeros += 1;
            if leading_zeros > MAX_UEG_LEADING_ZEROS {
                return Err(ZhenError::InvalidData("Exp-Golomb 前导零过多".into()));
            }
        }

        if leading_zeros == 0 {
            return Ok(0);
        }

        let suffix = self.read_bits(leading_zeros)?;
        Ok(((1u32 << leading_zeros) | suffix) - 1)
    }

    /// 读取有符号 Exp-Golomb 编码值 se(v)
    ///
    /// 映射: 0→0, 1→1, 2→-1, 3→2, 4→-2, ...
    pub fn read_seg(&mut self) -> ZhenResult<i32> {
        let code = i64::from(self.read_ueg()?);
        let value = if code & 1 == 1 {
            (code + 1) >> 1
        } else {
            -(code >> 1)
        };
        Ok(value as i32)
    }
}
