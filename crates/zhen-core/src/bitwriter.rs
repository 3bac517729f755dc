//! 比特流写入器.
//!
//! 与 [`BitReader`](crate::bitreader::BitReader) 对应的 MSB first 写入器,
//! 主要用于构造 SPS 等位粒度测试数据, 以及验证 Exp-Golomb 编码的往返一致性.

/// 比特流写入器
///
/// # 示例
/// ```
/// use zhen_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b1011, 4);
/// bw.write_ueg(0);
/// let data = bw.finish();
/// assert_eq!(data, vec![0b10111000]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    /// 输出缓冲区
    data: Vec<u8>,
    /// 当前字节 (正在填充)
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.bit_count as usize
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: u32) {
        self.current_byte = (self.current_byte << 1) | (bit & 1) as u8;
        self.bit_count += 1;
        if self.bit_count >= 8 {
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入 1 位标志
    pub fn write_flag(&mut self, flag: bool) {
        self.write_bit(u32::from(flag));
    }

    /// 写入 N 个位 (最多 32 位), 高位在前
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1);
        }
    }

    /// 写入无符号 Exp-Golomb 编码值 ue(v)
    pub fn write_ueg(&mut self, value: u32) {
        let code = u64::from(value) + 1;
        let num_bits = 64 - code.leading_zeros();
        for _ in 0..num_bits - 1 {
            self.write_bit(0);
        }
        for i in (0..num_bits).rev() {
            self.write_bit(((code >> i) & 1) as u32);
        }
    }

    /// 写入有符号 Exp-Golomb 编码值 se(v)
    pub fn write_seg(&mut self, value: i32) {
        let value = i64::from(value);
        let code = if value <= 0 { -2 * value } else { 2 * value - 1 };
        self.write_ueg(code as u32);
    }

    /// 写入整字节 (要求当前字节对齐)
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_bits(u32::from(b), 8);
        }
    }

    /// 补 0 对齐到字节边界
    pub fn align_to_byte(&mut self) {
        while self.bit_count != 0 {
            self.write_bit(0);
        }
    }

    /// 补齐最后一个字节并返回缓冲区
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bits_basic() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b1011, 4);
        bw.write_bits(0b0001, 4);
        bw.write_bits(0b01010101, 8);
        assert_eq!(bw.bits_written(), 16);
        assert_eq!(bw.finish(), vec![0b10110001, 0b01010101]);
    }

    #[test]
    fn test_write_ueg_codes() {
        // 0→1, 1→010, 2→011, 3→00100
        let mut bw = BitWriter::new();
        bw.write_ueg(0);
        bw.write_ueg(1);
        bw.write_ueg(2);
        bw.write_ueg(3);
        assert_eq!(bw.bits_written(), 1 + 3 + 3 + 5);
        assert_eq!(bw.finish(), vec![0b10100110, 0b01000000]);
    }

    #[test]
    fn test_write_seg_codes() {
        // 0→ue(0), 1→ue(1), -1→ue(2)
        let mut bw = BitWriter::new();
        bw.write_seg(0);
        bw.write_seg(1);
        bw.write_seg(-1);
        assert_eq!(bw.finish(), vec![0b10100110]);
    }

    #[test]
    fn test_align_and_bytes() {
        let mut bw = BitWriter::new();
        bw.write_flag(true);
        bw.align_to_byte();
        bw.write_bytes(&[0xAB, 0xCD]);
        assert_eq!(bw.finish(), vec![0x80, 0xAB, 0xCD]);
    }
}
