//! Loading recordings as mono samples at the rate the models were trained on.

use std::fs::File;
use std::path::Path;

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters};
use symphonia::core::{
    audio::SampleBuffer, codecs::{CODEC_TYPE_NULL, DecoderOptions}, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

use crate::error::{PrepError, Result};

fn audio_err(e: impl std::fmt::Display) -> PrepError {
    PrepError::Audio(e.to_string())
}

/// Resamples a single audio array to the target sample rate.
pub fn resample(audio_array: Vec<f32>, original_sr: u32, target_sr: u32) -> Result<Vec<f32>> {
    if original_sr == target_sr || audio_array.is_empty() {
        return Ok(audio_array);
    }

    // Highest-quality settings.
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: rubato::SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window: rubato::WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        target_sr as f64 / original_sr as f64,
        2.0,
        params,
        audio_array.len(),
        1, // Number of channels.
    )
    .map_err(audio_err)?;

    // Rubato expects a Vec<Vec<f32>>.
    let waves_in = vec![audio_array];
    let waves_out = resampler.process(&waves_in, None).map_err(audio_err)?;

    waves_out
        .into_iter()
        .next()
        .ok_or_else(|| PrepError::Audio("resampler produced no channels".into()))
}

/// Symphonia signals the end of a stream with an `UnexpectedEof` IO error.
fn is_end_of_stream(err: &SymphoniaError) -> bool {
    matches!(err, SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
}

/// Decodes an audio file to mono f32 samples and returns them with their sample rate.
pub fn decode_file(path: &Path) -> Result<(Vec<f32>, u32)> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(audio_err)?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PrepError::Audio(format!("no supported audio track in {}", path.display())))?;
    let track_id = track.id;

    let original_sr = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PrepError::Audio(format!("missing sample rate in {}", path.display())))?;
    let decode_options = DecoderOptions { verify: true };
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &decode_options)
        .map_err(audio_err)?;

    let mut pcm_f32 = Vec::new();

    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track_id {
                    continue;
                }
                let decoded = decoder.decode(&packet).map_err(audio_err)?;
                let channel_count = decoded.spec().channels.count();
                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                sample_buf.copy_interleaved_ref(decoded);

                // Convert to mono if necessary and extend our buffer
                if channel_count > 1 {
                    for frame in sample_buf.samples().chunks(channel_count) {
                        pcm_f32.push(frame.iter().sum::<f32>() / frame.len() as f32);
                    }
                } else {
                    pcm_f32.extend_from_slice(sample_buf.samples());
                }
            }
            Err(e) if is_end_of_stream(&e) => break,
            Err(e) => return Err(audio_err(format!("error during decoding: {e}"))),
        }
    }

    Ok((pcm_f32, original_sr))
}

/// Decodes `path` and resamples it to `target_sr`.
pub fn load(path: &Path, target_sr: u32) -> Result<Vec<f32>> {
    let (samples, sr) = decode_file(path)?;
    resample(samples, sr, target_sr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::TempDir;

    fn write_tone(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        let frames = (sample_rate as f32 * seconds) as usize;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let s = ((t * 440.0 * std::f32::consts::TAU).sin() * 0.5 * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_mono_wav() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("S01.01.01.wav");
        write_tone(&path, 16000, 1, 0.5);

        let (samples, sr) = decode_file(&path).unwrap();
        assert_eq!(sr, 16000);
        assert_eq!(samples.len(), 8000);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_stereo_is_downmixed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stereo.wav");
        write_tone(&path, 16000, 2, 0.25);

        let (samples, _) = decode_file(&path).unwrap();
        assert_eq!(samples.len(), 4000);
    }

    #[test]
    fn test_load_resamples() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hi.wav");
        write_tone(&path, 32000, 1, 0.5);

        let samples = load(&path, 16000).unwrap();
        // Sinc resampling trims a little at the edges.
        assert!((7800..=8200).contains(&samples.len()), "{}", samples.len());
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![0.1, -0.2, 0.3];
        assert_eq!(resample(samples.clone(), 16000, 16000).unwrap(), samples);
    }

    #[test]
    fn test_only_eof_ends_the_stream() {
        use std::io::{Error, ErrorKind};

        assert!(is_end_of_stream(&SymphoniaError::IoError(Error::new(ErrorKind::UnexpectedEof, "end"))));
        assert!(!is_end_of_stream(&SymphoniaError::IoError(Error::new(ErrorKind::PermissionDenied, "denied"))));
        assert!(!is_end_of_stream(&SymphoniaError::DecodeError("bad frame")));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            decode_file(Path::new("/nonexistent/S01.01.01.wav")),
            Err(PrepError::Io(_))
        ));
    }
}
