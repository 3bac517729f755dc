//! H.264 NAL 单元辅助函数.

/// NAL 单元类型: SPS
pub const NAL_TYPE_SPS: u8 = 7;

/// 从 NAL 头部字节中取出 nal_unit_type
pub fn nal_unit_type(header: u8) -> u8 {
    header & 0x1F
}

/// 移除 emulation prevention 字节 (0x00 0x00 0x03 → 0x00 0x00)
///
/// 编码器在 RBSP 中连续两个 0x00 之后插入 0x03, 防止与起始码混淆.
/// 按位解析参数集之前必须先移除.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let is_emulation_prevention =
            i + 2 < data.len() && data[i] == 0x00 && data[i + 1] == 0x00 && data[i + 2] == 0x03;
        if is_emulation_prevention {
            rbsp.push(0x00);
            rbsp.push(0x00);
            i += 3;
        } else {
            rbsp.push(data[i]);
            i += 1;
        }
    }

    rbsp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nal_unit_type() {
        assert_eq!(nal_unit_type(0x67), NAL_TYPE_SPS);
        assert_eq!(nal_unit_type(0x68), 8);
        assert_eq!(nal_unit_type(0x65), 5);
    }

    #[test]
    fn test_emulation_prevention_remove() {
        let data = [0x67, 0x00, 0x00, 0x03, 0x01, 0xAA];
        assert_eq!(
            remove_emulation_prevention(&data),
            vec![0x67, 0x00, 0x00, 0x01, 0xAA]
        );
    }

    #[test]
    fn test_emulation_prevention_consecutive() {
        let data = [0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x00];
        assert_eq!(
            remove_emulation_prevention(&data),
            vec![0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_emulation_prevention_trailing_pattern_kept() {
        // 末尾的 00 00 03 之后没有字节, 仍按防竞争处理
        let data = [0x11, 0x00, 0x00, 0x03];
        assert_eq!(remove_emulation_prevention(&data), vec![0x11, 0x00, 0x00]);

        // 不完整的模式原样保留
        let data = [0x00, 0x00];
        assert_eq!(remove_emulation_prevention(&data), vec![0x00, 0x00]);
    }
}
