//! 内存字节游标.
//!
//! FLV 文件整体加载到内存后解析, 所有读取都限制在给定切片内.
//! 多字节整数一律按大端序读取 (FLV 与 AMF0 都是网络字节序).

use byteorder::{BigEndian, ByteOrder};
use zhen_core::{ZhenError, ZhenResult};

/// 有界字节游标
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// 从切片起始位置创建游标
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 当前读取位置 (相对切片起点)
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 切片总长度
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 切片是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 剩余可读字节数
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, count: usize) -> ZhenResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(ZhenError::InvalidData(format!(
                "数据不足: 位置 {} 需要 {} 字节, 剩余 {} 字节",
                self.pos,
                count,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// 查看下一个字节但不移动位置
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// 读取 1 个字节
    pub fn read_u8(&mut self) -> ZhenResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// 读取 u16 大端
    pub fn read_u16_be(&mut self) -> ZhenResult<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    /// 读取 u24 大端 (3 字节无符号整数)
    pub fn read_u24_be(&mut self) -> ZhenResult<u32> {
        Ok(BigEndian::read_u24(self.take(3)?))
    }

    /// 读取有符号 24 位大端整数
    pub fn read_i24_be(&mut self) -> ZhenResult<i32> {
        Ok(BigEndian::read_i24(self.take(3)?))
    }

    /// 读取 u32 大端
    pub fn read_u32_be(&mut self) -> ZhenResult<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    /// 读取 IEEE-754 双精度浮点 (大端)
    pub fn read_f64_be(&mut self) -> ZhenResult<f64> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }

    /// 读取指定数量的字节 (借用, 不复制)
    pub fn read_bytes(&mut self, count: usize) -> ZhenResult<&'a [u8]> {
        self.take(count)
    }

    /// 读取 Latin-1 字符串: 每个字节直接映射为同码位字符
    pub fn read_latin1(&mut self, count: usize) -> ZhenResult<String> {
        Ok(self.take(count)?.iter().map(|&b| char::from(b)).collect())
    }

    /// 跳过指定字节数
    pub fn skip(&mut self, count: usize) -> ZhenResult<()> {
        self.take(count).map(|_| ())
    }

    /// 直接移动到末尾, 放弃剩余数据
    pub fn skip_to_end(&mut self) {
        self.pos = self.data.len();
    }
}
