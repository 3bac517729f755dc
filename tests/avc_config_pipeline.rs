//! AVC 序列头集成测试: BitWriter 构造 SPS -> 配置记录 -> FLV 视频 Tag -> 解析结果.

use zhen::codec::{AvcDecoderConfig, AvcProfile, parse_sps};
use zhen::core::BitWriter;
use zhen::format::parse;

/// 测试用 SPS 参数
struct SpsParams {
    profile_idc: u8,
    level_idc: u8,
    scaling_lists: bool,
    poc_type: u32,
    width_mbs: u32,
    height_map_units: u32,
    frame_mbs_only: bool,
}

impl Default for SpsParams {
    fn default() -> Self {
        Self {
            profile_idc: 100,
            level_idc: 40,
            scaling_lists: false,
            poc_type: 0,
            width_mbs: 120,
            height_map_units: 68,
            frame_mbs_only: true,
        }
    }
}

/// 生成 RBSP (含 NAL 头, 未做防竞争处理)
fn build_sps_rbsp(p: &SpsParams) -> Vec<u8> {
    let high = matches!(p.profile_idc, 100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128);
    let mut bw = BitWriter::new();
    bw.write_bits(0x67, 8);
    bw.write_bits(u32::from(p.profile_idc), 8);
    bw.write_bits(0x00, 8);
    bw.write_bits(u32::from(p.level_idc), 8);
    bw.write_ueg(0); // sps_id
    if high {
        bw.write_ueg(1); // 4:2:0
        bw.write_ueg(0);
        bw.write_ueg(0);
        bw.write_flag(false);
        bw.write_flag(p.scaling_lists);
        if p.scaling_lists {
            for _ in 0..8 {
                bw.write_flag(true);
                // 8 -> 16 -> 12 -> 0: 第三项把 nextScale 归零, 剩余项不再出现在码流中
                bw.write_seg(8);
                bw.write_seg(-4);
                bw.write_seg(-12);
            }
        }
    }
    bw.write_ueg(0); // log2_max_frame_num_minus4
    bw.write_ueg(p.poc_type);
    match p.poc_type {
        0 => bw.write_ueg(2),
        1 => {
            bw.write_flag(false);
            // 31 个前导零的大数值, 码流中必然出现 00 00 00
            bw.write_seg(1 << 30);
            bw.write_seg(0);
            bw.write_ueg(1);
            bw.write_seg(-2);
        }
        _ => {}
    }
    bw.write_ueg(3); // max_num_ref_frames
    bw.write_flag(false);
    bw.write_ueg(p.width_mbs - 1);
    bw.write_ueg(p.height_map_units - 1);
    bw.write_flag(p.frame_mbs_only);
    if !p.frame_mbs_only {
        bw.write_flag(false);
    }
    bw.write_flag(true); // direct_8x8_inference_flag
    bw.write_flag(false); // frame_cropping_flag
    bw.write_flag(false); // vui_parameters_present_flag
    bw.write_flag(true); // rbsp_stop_one_bit
    bw.finish()
}

/// 插入防竞争字节 (00 00 0x -> 00 00 03 0x)
fn insert_emulation_prevention(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len() + 8);
    let mut zeros = 0;
    for &b in rbsp {
        if zeros >= 2 && b <= 3 {
            out.push(0x03);
            zeros = 0;
        }
        out.push(b);
        zeros = if b == 0 { zeros + 1 } else { 0 };
    }
    out
}

fn build_record(profile: u8, level: u8, sps_list: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![1, profile, 0x00, level, 0xFF, 0xE0 | sps_list.len() as u8];
    for sps in sps_list {
        out.extend_from_slice(&(sps.len() as u16).to_be_bytes());
        out.extend_from_slice(sps);
    }
    out.extend_from_slice(&[1, 0x00, 0x04, 0x68, 0xEE, 0x3C, 0x80]);
    out
}

/// 单个 AVC 序列头视频 Tag 组成的 FLV 文件
fn build_flv_with_record(record: &[u8]) -> Vec<u8> {
    let mut payload = vec![0x17, 0x00, 0x00, 0x00, 0x00];
    payload.extend_from_slice(record);

    let mut data = b"FLV\x01\x01\x00\x00\x00\x09".to_vec();
    data.extend_from_slice(&0u32.to_be_bytes());
    data.push(9);
    data.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]);
    data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0]);
    data.extend_from_slice(&payload);
    data.extend_from_slice(&(11 + payload.len() as u32).to_be_bytes());
    data
}

#[test]
fn test_high_profile_1080p() {
    let sps = insert_emulation_prevention(&build_sps_rbsp(&SpsParams::default()));
    let config = AvcDecoderConfig::parse(&build_record(100, 40, &[sps])).unwrap();

    assert_eq!(config.profile(), AvcProfile::High);
    assert_eq!(config.level(), 4.0);
    let info = config.video_info().expect("SPS 应该解析成功");
    assert_eq!((info.width, info.height), (1920, 1088));
    assert_eq!(info.profile, Some(AvcProfile::High));
}

#[test]
fn test_scaling_lists_with_early_stop() {
    let params = SpsParams {
        scaling_lists: true,
        width_mbs: 80,
        height_map_units: 45,
        ..SpsParams::default()
    };
    let sps = parse_sps(&insert_emulation_prevention(&build_sps_rbsp(&params))).unwrap();
    assert_eq!((sps.width, sps.height), (1280, 720));
}

#[test]
fn test_emulation_prevention_is_removed() {
    let params = SpsParams {
        poc_type: 1,
        width_mbs: 40,
        height_map_units: 15,
        frame_mbs_only: false,
        ..SpsParams::default()
    };
    let rbsp = build_sps_rbsp(&params);
    let nal = insert_emulation_prevention(&rbsp);
    assert!(nal.len() > rbsp.len(), "测试码流必须包含防竞争字节");

    let sps = parse_sps(&nal).unwrap();
    assert_eq!(sps.poc_type, 1);
    assert!(!sps.frame_mbs_only);
    // 场编码: 高度 = map_units * 2 * 16
    assert_eq!((sps.width, sps.height), (640, 480));
}

#[test]
fn test_flv_video_info_from_sequence_header() {
    let main_sps = insert_emulation_prevention(&build_sps_rbsp(&SpsParams {
        profile_idc: 77,
        level_idc: 31,
        width_mbs: 80,
        height_map_units: 45,
        ..SpsParams::default()
    }));
    let record = build_record(77, 31, &[main_sps]);
    let result = parse(build_flv_with_record(&record));

    assert!(result.is_complete());
    assert_eq!(result.frames.len(), 1);
    let frame = &result.frames[0];
    assert!(frame.is_keyframe);
    assert!(frame.is_sequence_header);
    assert!(frame.details.starts_with("序列头帧\n"));
    assert!(
        frame.details.contains("Profile: Main, Level: 3.1\n分辨率: 1280x720\n"),
        "details 内容: {}",
        frame.details
    );
}

#[test]
fn test_broken_sps_keeps_frame() {
    let good = insert_emulation_prevention(&build_sps_rbsp(&SpsParams::default()));
    // 截断到只剩 NAL 头和 profile/level, 位流读取会越界
    let broken = good[..4].to_vec();
    let record = build_record(100, 40, &[broken]);
    let result = parse(build_flv_with_record(&record));

    assert!(result.is_complete(), "SPS 错误不终止解析");
    let frame = &result.frames[0];
    assert!(frame.is_sequence_header);
    assert!(frame.details.contains("解析SPS失败: "));
    assert!(!frame.details.contains("分辨率"));
}

#[test]
fn test_truncated_record_reported_in_details() {
    let result = parse(build_flv_with_record(&[1, 100, 0, 40]));
    assert!(result.is_complete());
    let frame = &result.frames[0];
    assert!(frame.is_sequence_header);
    assert!(frame.details.contains("解析视频数据时出错: "));
}
