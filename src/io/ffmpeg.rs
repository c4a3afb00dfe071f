// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! FFmpeg-backed video streams.
//!
//! Metadata comes from `ffprobe`; frames are streamed as packed `rgb24`
//! through the stdout/stdin pipes of `ffmpeg` child processes, so only one
//! frame is ever held in memory.

use super::media::{FrameRate, FrameSink, FrameSource, OUTPUT_FOURCC};
use crate::config::Settings;
use crate::error::VideoError;
use image::RgbImage;
use serde::Deserialize;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Stream metadata reported by `ffprobe`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub rate: FrameRate,
}

impl StreamInfo {
    pub fn fps(&self) -> f64 {
        self.rate.as_f64()
    }
}

/// Parse an ffprobe rate such as `30000/1001`, `25` or `29.97`.
fn parse_rate(rate: &str) -> Option<FrameRate> {
    let rate = rate.trim();
    let parsed = match rate.split_once('/') {
        Some((num, den)) => FrameRate::new(num.trim().parse().ok()?, den.trim().parse().ok()?),
        None => match rate.parse::<u32>() {
            Ok(whole) => FrameRate::new(whole, 1),
            Err(_) => {
                let value: f64 = rate.parse().ok()?;
                if !value.is_finite() || value <= 0.0 {
                    return None;
                }
                FrameRate::from_f64(value)
            }
        },
    };
    (parsed.num > 0 && parsed.den > 0).then_some(parsed)
}

fn parse_probe(path: &Path, json: &[u8]) -> Result<StreamInfo, VideoError> {
    let output: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| VideoError::probe(path, e.to_string()))?;
    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| VideoError::probe(path, "no video stream"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(VideoError::probe(path, "missing frame dimensions")),
    };
    let rate = [stream.r_frame_rate, stream.avg_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|rate| parse_rate(&rate))
        .ok_or_else(|| VideoError::probe(path, "missing frame rate"))?;

    Ok(StreamInfo {
        width,
        height,
        rate,
    })
}

/// Run `ffprobe` on the first video stream of `path`.
pub fn probe(path: &Path, settings: &Settings) -> Result<StreamInfo, VideoError> {
    let output = Command::new(&settings.ffprobe_path)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| VideoError::probe(path, spawn_message("ffprobe", &e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VideoError::probe(path, stderr.trim().to_string()));
    }
    parse_probe(path, &output.stdout)
}

/// Whether an `ffmpeg` binary can be started.
pub fn is_available(settings: &Settings) -> bool {
    Command::new(&settings.ffmpeg_path)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn spawn_message(tool: &str, err: &std::io::Error) -> String {
    if err.kind() == ErrorKind::NotFound {
        format!("{} was not found on PATH", tool)
    } else {
        format!("failed to start {}: {}", tool, err)
    }
}

/// A child process whose stderr is drained on a helper thread.
struct Process {
    child: Child,
    stderr_task: Option<JoinHandle<String>>,
}

impl Process {
    fn spawn(cmd: &mut Command) -> std::io::Result<Self> {
        let mut child = cmd.stderr(Stdio::piped()).spawn()?;
        // Drain stderr so ffmpeg never blocks on a full pipe.
        let stderr_task = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut output = String::new();
                match stderr.read_to_string(&mut output) {
                    Ok(_) => output,
                    Err(err) => format!("<failed to read ffmpeg stderr: {}>", err),
                }
            })
        });
        Ok(Self { child, stderr_task })
    }

    /// Wait for exit and collect what the process wrote to stderr.
    fn wait(&mut self) -> std::io::Result<(ExitStatus, String)> {
        let status = self.child.wait()?;
        let stderr = self
            .stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();
        Ok((status, stderr.trim().to_string()))
    }

    fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            log::debug!("ffmpeg already exited: {}", e);
        }
        let _ = self.wait();
    }
}

/// Decoder reading raw frames from `ffmpeg -f rawvideo`.
pub struct FfmpegSource {
    info: StreamInfo,
    process: Option<Process>,
    stdout: Option<ChildStdout>,
    frame_len: usize,
}

impl FfmpegSource {
    pub fn open(path: &Path, settings: &Settings) -> Result<Self, VideoError> {
        let info = probe(path, settings)?;
        let mut process = Process::spawn(
            Command::new(&settings.ffmpeg_path)
                // Frames must keep the stored orientation ffprobe reported.
                .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-noautorotate", "-i"])
                .arg(path)
                .args(["-map", "0:v:0", "-an"])
                // One output frame per decoded frame, no duplicates or drops.
                .args(["-fps_mode", "passthrough"])
                .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
                .stdin(Stdio::null())
                .stdout(Stdio::piped()),
        )
        .map_err(|e| VideoError::open(path, spawn_message("ffmpeg", &e)))?;

        let stdout = process.child.stdout.take();
        if stdout.is_none() {
            process.kill();
            return Err(VideoError::open(path, "failed to capture ffmpeg stdout"));
        }

        log::debug!(
            "Decoding {} ({}x{} @ {} fps) with ffmpeg",
            path.display(),
            info.width,
            info.height,
            info.rate
        );
        Ok(Self {
            info,
            process: Some(process),
            stdout,
            frame_len: info.width as usize * info.height as usize * 3,
        })
    }

    /// The decoder hit end of output: reap it and report a failed exit.
    fn finish_stream(&mut self) -> Result<(), VideoError> {
        self.stdout = None;
        if let Some(mut process) = self.process.take() {
            let (status, stderr) = process.wait()?;
            if !status.success() {
                return Err(VideoError::decode(format!(
                    "ffmpeg exited with {}: {}",
                    status, stderr
                )));
            }
        }
        Ok(())
    }
}

impl FrameSource for FfmpegSource {
    fn width(&self) -> u32 {
        self.info.width
    }

    fn height(&self) -> u32 {
        self.info.height
    }

    fn fps(&self) -> f64 {
        self.info.fps()
    }

    fn frame_rate(&self) -> FrameRate {
        self.info.rate
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>, VideoError> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < buf.len() {
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled < buf.len() {
            if filled > 0 {
                log::warn!(
                    "Dropping truncated trailing frame ({} of {} bytes)",
                    filled,
                    buf.len()
                );
            }
            self.finish_stream()?;
            return Ok(None);
        }

        RgbImage::from_raw(self.info.width, self.info.height, buf)
            .map(Some)
            .ok_or_else(|| VideoError::decode("frame buffer size mismatch"))
    }

    fn close(&mut self) -> Result<(), VideoError> {
        self.stdout = None;
        if let Some(mut process) = self.process.take() {
            // Stopped before the end of the stream; the rest is not needed.
            process.kill();
        }
        Ok(())
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Encoder feeding raw frames into `ffmpeg` and writing an `mp4v` file.
pub struct FfmpegSink {
    width: u32,
    height: u32,
    process: Option<Process>,
    stdin: Option<ChildStdin>,
}

impl FfmpegSink {
    pub fn create(
        path: &Path,
        width: u32,
        height: u32,
        rate: FrameRate,
        settings: &Settings,
    ) -> Result<Self, VideoError> {
        let tag: String = OUTPUT_FOURCC.iter().collect();
        let mut process = Process::spawn(
            Command::new(&settings.ffmpeg_path)
                .args(["-hide_banner", "-loglevel", "error", "-y"])
                .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
                .arg("-s:v")
                .arg(format!("{}x{}", width, height))
                .arg("-r")
                .arg(rate.to_string())
                .args(["-i", "-", "-an", "-c:v", "mpeg4", "-tag:v"])
                .arg(tag)
                .args(["-q:v", "2", "-f", "mp4"])
                .arg(path)
                .stdin(Stdio::piped())
                .stdout(Stdio::null()),
        )
        .map_err(|e| VideoError::open(path, spawn_message("ffmpeg", &e)))?;

        let stdin = process.child.stdin.take();
        if stdin.is_none() {
            process.kill();
            return Err(VideoError::open(path, "failed to capture ffmpeg stdin"));
        }

        log::debug!(
            "Encoding {} ({}x{} @ {} fps) with ffmpeg",
            path.display(),
            width,
            height,
            rate
        );
        Ok(Self {
            width,
            height,
            process: Some(process),
            stdin,
        })
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(VideoError::encode(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| VideoError::encode("encoder already closed"))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| VideoError::encode(format!("ffmpeg stopped accepting frames: {}", e)))
    }

    fn close(&mut self) -> Result<(), VideoError> {
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.flush() {
                log::warn!("Failed to flush ffmpeg stdin: {}", e);
            }
        }
        if let Some(mut process) = self.process.take() {
            let (status, stderr) = process.wait()?;
            if !status.success() {
                return Err(VideoError::encode(format!(
                    "ffmpeg exited with {}: {}",
                    status, stderr
                )));
            }
        }
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Encoder closed with error: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("25/1"), Some(FrameRate::new(25, 1)));
        assert_eq!(parse_rate("30"), Some(FrameRate::new(30, 1)));
        assert_eq!(parse_rate("30000/1001"), Some(FrameRate::new(30000, 1001)));
        assert_eq!(parse_rate("29.97"), Some(FrameRate::new(29970, 1000)));
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{"streams":[{"width":1920,"height":1080,"r_frame_rate":"0/0","avg_frame_rate":"24/1"}]}"#;
        let info = parse_probe(Path::new("a.mp4"), json).unwrap();
        assert_eq!(
            info,
            StreamInfo {
                width: 1920,
                height: 1080,
                rate: FrameRate::new(24, 1),
            }
        );
        assert_eq!(info.fps(), 24.0);
    }

    #[test]
    fn test_parse_probe_keeps_exact_rate() {
        let json = br#"{"streams":[{"width":640,"height":480,"r_frame_rate":"30000/1001"}]}"#;
        let info = parse_probe(Path::new("a.mp4"), json).unwrap();
        assert_eq!(info.rate.to_string(), "30000/1001");
    }

    #[test]
    fn test_parse_probe_without_video_stream() {
        let err = parse_probe(Path::new("a.mp3"), br#"{"streams":[]}"#).unwrap_err();
        assert!(err.to_string().contains("no video stream"));
    }

    #[test]
    fn test_missing_ffprobe_binary() {
        let settings = Settings {
            ffprobe_path: "/nonexistent/ffprobe".into(),
            ..Settings::default()
        };
        let err = probe(Path::new("clip.mp4"), &settings).unwrap_err();
        assert!(err.to_string().contains("ffprobe was not found"));
    }

    /// Write an executable shell script standing in for an ffmpeg tool.
    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Settings pointing at a 2x2, 30000/1001 fps ffprobe and an ffmpeg that
    /// records its arguments in `args.txt` before running `ffmpeg_body`.
    #[cfg(unix)]
    fn fake_settings(dir: &Path, ffmpeg_body: &str) -> Settings {
        let probe_json = r#"{"streams":[{"width":2,"height":2,"r_frame_rate":"30000/1001"}]}"#;
        let ffprobe = fake_tool(dir, "ffprobe", &format!("echo '{}'", probe_json));
        let args_file = dir.join("args.txt");
        let ffmpeg = fake_tool(
            dir,
            "ffmpeg",
            &format!("echo \"$@\" > '{}'\n{}", args_file.display(), ffmpeg_body),
        );
        Settings {
            ffmpeg_path: ffmpeg,
            ffprobe_path: ffprobe,
            ..Settings::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_decoder_clean_exit_ends_stream() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fake_settings(dir.path(), "head -c 12 /dev/zero");
        let mut source = FfmpegSource::open(Path::new("clip.mp4"), &settings).unwrap();
        assert_eq!(source.frame_rate(), FrameRate::new(30000, 1001));

        let frame = source.read_frame().unwrap().unwrap();
        assert_eq!(frame.dimensions(), (2, 2));
        assert!(source.read_frame().unwrap().is_none());
        assert!(source.read_frame().unwrap().is_none());

        let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert!(args.contains("-noautorotate -i clip.mp4"), "{}", args);
        assert!(args.contains("-fps_mode passthrough"), "{}", args);
    }

    #[cfg(unix)]
    #[test]
    fn test_decoder_failure_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fake_settings(dir.path(), "echo boom >&2\nexit 1");
        let mut source = FfmpegSource::open(Path::new("clip.mp4"), &settings).unwrap();

        match source.read_frame() {
            Err(VideoError::Decode(message)) => {
                assert!(message.contains("exit status: 1"), "{}", message);
                assert!(message.ends_with("boom"), "{}", message);
            }
            other => panic!("expected a decode error, got {:?}", other.map(|f| f.is_some())),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_encoder_writes_mp4_at_exact_rate() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fake_settings(dir.path(), "cat > /dev/null");
        let output = dir.path().join("out.mov");
        let mut sink =
            FfmpegSink::create(&output, 2, 2, FrameRate::new(30000, 1001), &settings).unwrap();
        sink.write_frame(&RgbImage::new(2, 2)).unwrap();
        sink.close().unwrap();

        let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert!(args.contains("-r 30000/1001"), "{}", args);
        assert!(
            args.trim_end().ends_with(&format!("-f mp4 {}", output.display())),
            "{}",
            args
        );
    }
}
