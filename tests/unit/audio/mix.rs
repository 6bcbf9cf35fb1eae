use super::*;
use crate::card::CardKind;

fn pcm(sample_rate: u32, channels: u16, interleaved_f32: Vec<f32>) -> AudioPcm {
    AudioPcm {
        sample_rate,
        channels,
        interleaved_f32,
    }
}

#[test]
fn frame_to_sample_uses_rational_fps() {
    let fps = Fps::new(30000, 1001).unwrap();
    let samples = frame_to_sample(300, fps, 48_000);
    assert!(samples > 470_000 && samples < 490_000);
    assert_eq!(frame_to_sample(30, Fps::REEL, 48_000), 48_000);
}

#[test]
fn mono_source_is_duplicated_to_both_channels() {
    let src = pcm(4, 1, vec![0.5, 0.5]);
    let manifest = AudioManifest {
        sample_rate: 4,
        channels: 2,
        total_samples: 4,
        segments: vec![AudioSegment {
            timeline_start_sample: 1,
            timeline_end_sample: 4,
            source: &src,
        }],
    };
    let out = mix_manifest(&manifest);
    assert_eq!(out, vec![0.0, 0.0, 0.5, 0.5, 0.5, 0.5, 0.0, 0.0]);
}

#[test]
fn segment_is_cut_at_its_end_sample() {
    let src = pcm(4, 2, vec![1.0; 8]);
    let manifest = AudioManifest {
        sample_rate: 4,
        channels: 2,
        total_samples: 4,
        segments: vec![AudioSegment {
            timeline_start_sample: 0,
            timeline_end_sample: 2,
            source: &src,
        }],
    };
    let out = mix_manifest(&manifest);
    assert_eq!(&out[0..4], &[1.0; 4]);
    assert_eq!(&out[4..8], &[0.0; 4]);
}

#[test]
fn lower_rate_sources_are_resampled() {
    // 2 Hz source, 4 Hz mix: every source frame spans two output frames.
    let src = pcm(2, 1, vec![0.0, 1.0]);
    let manifest = AudioManifest {
        sample_rate: 4,
        channels: 2,
        total_samples: 4,
        segments: vec![AudioSegment {
            timeline_start_sample: 0,
            timeline_end_sample: 4,
            source: &src,
        }],
    };
    let out = mix_manifest(&manifest);
    assert!((out[2] - 0.5).abs() < 1e-6);
    assert!((out[4] - 1.0).abs() < 1e-6);
}

#[test]
fn manifest_places_speech_at_card_start() {
    let cards = [
        Card {
            kind: CardKind::Countdown(1),
            text: "1".to_owned(),
            duration_sec: 1.0,
            audio: pcm(48_000, 1, vec![0.25; 4_800]),
        },
        Card {
            kind: CardKind::Word(0),
            text: "cat".to_owned(),
            duration_sec: 1.0,
            audio: pcm(48_000, 1, Vec::new()),
        },
        Card {
            kind: CardKind::Outro,
            text: "bye".to_owned(),
            duration_sec: 0.5,
            audio: pcm(48_000, 1, vec![0.5; 4_800]),
        },
    ];
    let refs: Vec<&Card> = cards.iter().collect();
    let timeline = Timeline::concat(refs.iter().copied(), Fps::REEL, 48_000).unwrap();
    let manifest = AudioManifest::from_timeline(&timeline, &refs).unwrap();

    assert_eq!(manifest.total_samples, 120_000);
    // The silent word card contributes nothing.
    assert_eq!(manifest.segments.len(), 2);
    assert_eq!(manifest.segments[0].timeline_start_sample, 0);
    assert_eq!(manifest.segments[1].timeline_start_sample, 96_000);

    let out = mix_manifest(&manifest);
    assert_eq!(out.len(), 240_000);
    assert!((out[0] - 0.25).abs() < 1e-6);
    assert_eq!(out[2 * 10_000], 0.0);
    assert!((out[2 * 96_000] - 0.5).abs() < 1e-6);
}

#[test]
fn f32le_file_round_trips_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mix.f32le");
    write_mix_to_f32le_file(&[0.5, -1.0], &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), -1.0);
}
