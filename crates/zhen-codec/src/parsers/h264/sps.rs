//! H.264 SPS (Sequence Parameter Set) 解析器.
//!
//! 只解析到计算分辨率所需的字段 (ITU-T H.264 7.3.2.1.1, 到 frame_mbs_only_flag 为止):
//! profile_idc, level_idc, 色度格式, 量化矩阵 (仅跳过), POC 参数, 宏块宽高.
//!
//! 输入是完整的 SPS NAL 单元 (含 1 字节 NAL 头), 来自 AVCDecoderConfigurationRecord.
//! 宽高不应用 frame cropping, 与 FLV 分析工具一贯显示的宏块对齐尺寸一致.

use log::warn;
use zhen_core::{BitReader, ZhenError, ZhenResult};

use super::nal::{NAL_TYPE_SPS, nal_unit_type, remove_emulation_prevention};

/// SPS 解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct Sps {
    /// profile_idc (66=Baseline, 77=Main, 100=High ...)
    pub profile_idc: u8,
    /// constraint_set 标志位与保留位
    pub constraint_set_flags: u8,
    /// level_idc (30=3.0, 41=4.1 ...)
    pub level_idc: u8,
    /// seq_parameter_set_id
    pub sps_id: u32,
    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4)
    pub chroma_format_idc: u32,
    /// 图像顺序计数类型 (0, 1, 2)
    pub poc_type: u32,
    /// 最大参考帧数
    pub max_num_ref_frames: u32,
    /// pic_width_in_mbs_minus1 + 1
    pub pic_width_in_mbs: u32,
    /// pic_height_in_map_units_minus1 + 1
    pub pic_height_in_map_units: u32,
    /// 是否只有帧宏块 (非场编码)
    pub frame_mbs_only: bool,
    /// 图像宽度 (像素, 宏块对齐)
    pub width: u32,
    /// 图像高度 (像素, 宏块对齐)
    pub height: u32,
}

/// 从 SPS NAL 单元解析 SPS
pub fn parse_sps(nal: &[u8]) -> ZhenResult<Sps> {
    if nal.is_empty() {
        return Err(ZhenError::InvalidData("H.264: SPS 数据为空".into()));
    }
    if nal_unit_type(nal[0]) != NAL_TYPE_SPS {
        warn!(
            "H.264: 参数集 NAL 类型不是 SPS, nal_unit_type={}",
            nal_unit_type(nal[0])
        );
    }

    let rbsp = remove_emulation_prevention(nal);
    let mut br = BitReader::new(&rbsp);

    // NAL header
    br.skip_bits(8)?;

    let profile_idc = br.read_bits(8)? as u8;
    let constraint_set_flags = br.read_bits(8)? as u8;
    let level_idc = br.read_bits(8)? as u8;
    let sps_id = br.read_ueg()?;

    let mut chroma_format_idc = 1;
    if is_high_profile(profile_idc) {
        chroma_format_idc = br.read_ueg()?;
        if chroma_format_idc == 3 {
            br.skip_bits(1)?; // separate_colour_plane_flag
        }
        br.read_ueg()?; // bit_depth_luma_minus8
        br.read_ueg()?; // bit_depth_chroma_minus8
        br.skip_bits(1)?; // qpprime_y_zero_transform_bypass_flag

        if br.read_flag()? {
            skip_seq_scaling_lists(&mut br, chroma_format_idc)?;
        }
    }

    br.read_ueg()?; // log2_max_frame_num_minus4

    let poc_type = br.read_ueg()?;
    match poc_type {
        0 => {
            br.read_ueg()?; // log2_max_pic_order_cnt_lsb_minus4
        }
        1 => {
            br.skip_bits(1)?; // delta_pic_order_always_zero_flag
            br.read_seg()?; // offset_for_non_ref_pic
            br.read_seg()?; // offset_for_top_to_bottom_field
            let num_ref_frames_in_poc_cycle = br.read_ueg()?;
            for _ in 0..num_ref_frames_in_poc_cycle {
                br.read_seg()?; // offset_for_ref_frame
            }
        }
        _ => {}
    }

    let max_num_ref_frames = br.read_ueg()?;
    br.skip_bits(1)?; // gaps_in_frame_num_value_allowed_flag

    let pic_width_in_mbs_minus1 = br.read_ueg()?;
    let pic_height_in_map_units_minus1 = br.read_ueg()?;

    let frame_mbs_only = br.read_flag()?;
    if !frame_mbs_only {
        br.skip_bits(1)?; // mb_adaptive_frame_field_flag
    }

    let pic_width_in_mbs = pic_width_in_mbs_minus1
        .checked_add(1)
        .ok_or_else(|| ZhenError::InvalidData("H.264: 计算宽度时发生溢出".into()))?;
    let pic_height_in_map_units = pic_height_in_map_units_minus1
        .checked_add(1)
        .ok_or_else(|| ZhenError::InvalidData("H.264: 计算高度时发生溢出".into()))?;

    let width = pic_width_in_mbs
        .checked_mul(16)
        .ok_or_else(|| ZhenError::InvalidData("H.264: 计算宽度时发生溢出".into()))?;
    let field_factor = if frame_mbs_only { 1 } else { 2 };
    let height = pic_height_in_map_units
        .checked_mul(field_factor)
        .and_then(|v| v.checked_mul(16))
        .ok_or_else(|| ZhenError::InvalidData("H.264: 计算高度时发生溢出".into()))?;

    Ok(Sps {
        profile_idc,
        constraint_set_flags,
        level_idc,
        sps_id,
        chroma_format_idc,
        poc_type,
        max_num_ref_frames,
        pic_width_in_mbs,
        pic_height_in_map_units,
        frame_mbs_only,
        width,
        height,
    })
}

/// 是否为 High Profile 家族 (SPS 带色度格式与量化矩阵字段)
fn is_high_profile(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134
    )
}

/// 跳过 seq_scaling_list (4:4:4 为 12 组, 其余 8 组)
fn skip_seq_scaling_lists(br: &mut BitReader, chroma_format_idc: u32) -> ZhenResult<()> {
    let list_count = if chroma_format_idc != 3 { 8 } else { 12 };
    for list_idx in 0..list_count {
        if br.read_flag()? {
            let size = if list_idx < 6 { 16 } else { 64 };
            skip_scaling_list(br, size)?;
        }
    }
    Ok(())
}

/// 按 delta_scale 语法跳过一组量化矩阵, nextScale 归零后不再有数据
fn skip_scaling_list(br: &mut BitReader, size: usize) -> ZhenResult<()> {
    let mut last_scale = 8i64;
    let mut next_scale = 8i64;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = i64::from(br.read_seg()?);
            next_scale = (last_scale + delta_scale + 256).rem_euclid(256);
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use zhen_core::BitWriter;

    /// 测试用 SPS 参数
    pub(crate) struct SpsFixture {
        pub profile_idc: u8,
        pub level_idc: u8,
        pub chroma_format_idc: u32,
        pub scaling_lists: bool,
        pub poc_type: u32,
        pub width_mbs: u32,
        pub height_map_units: u32,
        pub frame_mbs_only: bool,
    }

    impl Default for SpsFixture {
        fn default() -> Self {
            Self {
                profile_idc: 66,
                level_idc: 30,
                chroma_format_idc: 1,
                scaling_lists: false,
                poc_type: 0,
                width_mbs: 16,
                height_map_units: 9,
                frame_mbs_only: true,
            }
        }
    }

    /// 构造 SPS NAL 单元 (含 NAL 头)
    pub(crate) fn build_sps_nal(f: &SpsFixture) -> Vec<u8> {
        let mut bw = BitWriter::new();
        bw.write_bits(0x67, 8); // NAL header
        bw.write_bits(u32::from(f.profile_idc), 8);
        bw.write_bits(0xC0, 8); // constraint_set flags
        bw.write_bits(u32::from(f.level_idc), 8);
        bw.write_ueg(0); // sps_id

        if is_high_profile(f.profile_idc) {
            bw.write_ueg(f.chroma_format_idc);
            if f.chroma_format_idc == 3 {
                bw.write_flag(false);
            }
            bw.write_ueg(0);
            bw.write_ueg(0);
            bw.write_flag(false);
            bw.write_flag(f.scaling_lists);
            if f.scaling_lists {
                let list_count = if f.chroma_format_idc != 3 { 8 } else { 12 };
                for list_idx in 0..list_count {
                    // 偶数组给出显式矩阵, 奇数组缺省
                    let present = list_idx % 2 == 0;
                    bw.write_flag(present);
                    if present {
                        let size = if list_idx < 6 { 16 } else { 64 };
                        // 第一个 delta 为 +2, 之后全部为 0: 不会提前归零
                        bw.write_seg(2);
                        for _ in 1..size {
                            bw.write_seg(0);
                        }
                    }
                }
            }
        }

        bw.write_ueg(0); // log2_max_frame_num_minus4
        bw.write_ueg(f.poc_type);
        match f.poc_type {
            0 => bw.write_ueg(2),
            1 => {
                bw.write_flag(false);
                bw.write_seg(-3);
                bw.write_seg(5);
                bw.write_ueg(3);
                bw.write_seg(1);
                bw.write_seg(-1);
                bw.write_seg(7);
            }
            _ => {}
        }
        bw.write_ueg(4); // max_num_ref_frames
        bw.write_flag(false); // gaps_in_frame_num_value_allowed_flag
        bw.write_ueg(f.width_mbs - 1);
        bw.write_ueg(f.height_map_units - 1);
        bw.write_flag(f.frame_mbs_only);
        if !f.frame_mbs_only {
            bw.write_flag(true); // mb_adaptive_frame_field_flag
        }
        bw.write_flag(true); // direct_8x8_inference_flag
        bw.write_flag(false); // frame_cropping_flag
        bw.write_flag(false); // vui_parameters_present_flag
        bw.write_flag(true); // rbsp_stop_one_bit
        bw.finish()
    }

    #[test]
    fn test_sps_baseline_256x144() {
        let nal = build_sps_nal(&SpsFixture::default());
        let sps = parse_sps(&nal).unwrap();

        assert_eq!(sps.profile_idc, 66);
        assert_eq!(sps.constraint_set_flags, 0xC0);
        assert_eq!(sps.level_idc, 30);
        assert_eq!(sps.chroma_format_idc, 1);
        assert_eq!(sps.max_num_ref_frames, 4);
        assert_eq!(sps.width, 256);
        assert_eq!(sps.height, 144);
    }

    #[test]
    fn test_sps_high_profile_1080p_map_units() {
        let nal = build_sps_nal(&SpsFixture {
            profile_idc: 100,
            level_idc: 41,
            width_mbs: 120,
            height_map_units: 68,
            ..SpsFixture::default()
        });
        let sps = parse_sps(&nal).unwrap();

        assert_eq!(sps.profile_idc, 100);
        assert_eq!(sps.level_idc, 41);
        assert_eq!(sps.width, 1920);
        assert_eq!(sps.height, 1088);
    }

    #[test]
    fn test_sps_field_coding_doubles_height() {
        let nal = build_sps_nal(&SpsFixture {
            width_mbs: 45,
            height_map_units: 18,
            frame_mbs_only: false,
            ..SpsFixture::default()
        });
        let sps = parse_sps(&nal).unwrap();

        assert!(!sps.frame_mbs_only);
        assert_eq!(sps.width, 720);
        assert_eq!(sps.height, 576);
    }

    #[test]
    fn test_sps_poc_type1_fields_consumed() {
        let nal = build_sps_nal(&SpsFixture {
            poc_type: 1,
            width_mbs: 80,
            height_map_units: 45,
            ..SpsFixture::default()
        });
        let sps = parse_sps(&nal).unwrap();

        assert_eq!(sps.poc_type, 1);
        assert_eq!(sps.width, 1280);
        assert_eq!(sps.height, 720);
    }

    #[test]
    fn test_sps_poc_type2() {
        let nal = build_sps_nal(&SpsFixture {
            poc_type: 2,
            ..SpsFixture::default()
        });
        let sps = parse_sps(&nal).unwrap();
        assert_eq!(sps.poc_type, 2);
        assert_eq!((sps.width, sps.height), (256, 144));
    }

    #[test]
    fn test_sps_scaling_lists_skipped() {
        for chroma_format_idc in [1, 3] {
            let nal = build_sps_nal(&SpsFixture {
                profile_idc: 100,
                chroma_format_idc,
                scaling_lists: true,
                width_mbs: 40,
                height_map_units: 30,
                ..SpsFixture::default()
            });
            let sps = parse_sps(&nal).unwrap();
            assert_eq!(sps.chroma_format_idc, chroma_format_idc);
            assert_eq!((sps.width, sps.height), (640, 480));
        }
    }

    #[test]
    fn test_sps_truncated() {
        let nal = build_sps_nal(&SpsFixture::default());
        for len in [1, 4, 6] {
            assert!(parse_sps(&nal[..len]).is_err(), "截断到 {len} 字节应该失败");
        }
        assert!(matches!(
            parse_sps(&nal[..3]),
            Err(ZhenError::BitstreamOverrun { .. })
        ));
        assert!(parse_sps(&[]).is_err());
    }

    #[test]
    fn test_sps_emulation_prevention_inside_fields() {
        // constraint=0x00, level=0x00 之后的 0x03 是防竞争字节, 必须在按位解析前移除
        let mut bw = BitWriter::new();
        bw.write_ueg(0); // sps_id
        bw.write_ueg(0); // log2_max_frame_num_minus4
        bw.write_ueg(2); // poc_type
        bw.write_ueg(1); // max_num_ref_frames
        bw.write_flag(false);
        bw.write_ueg(19); // 320
        bw.write_ueg(14); // 240
        bw.write_flag(true);
        bw.write_flag(true);
        let tail = bw.finish();

        let mut nal = vec![0x67, 66, 0x00, 0x00, 0x03];
        nal.extend_from_slice(&tail);
        let sps = parse_sps(&nal).unwrap();
        assert_eq!(sps.level_idc, 0);
        assert_eq!((sps.width, sps.height), (320, 240));
    }
}
