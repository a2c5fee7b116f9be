//! FFmpeg command builder utilities
//!
//! Turns compression and concatenation plans into ffmpeg argument vectors.
//! Generation is pure apart from writing the concat list file, and every
//! number goes through fixed formatting, so identical plans always produce
//! byte-identical commands.

use crate::error::{CoreError, CoreResult};
use crate::media::orientation::transpose_filters;
use crate::planning::{AudioSource, CompressionPlan, ConcatPlan, Resolution, SplittingPlan};
use crate::utils::format_seconds;

use log::debug;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Generated silence used when a clip has no audio stream.
pub const SILENT_AUDIO_SOURCE: &str = "anullsrc=channel_layout=stereo:sample_rate=48000";

/// Output frame rate shared by every compressed clip (NTSC 29.97).
pub const OUTPUT_FRAME_RATE: &str = "30000/1001";

/// A fully built engine invocation: ffmpeg arguments, without the program name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    args: Vec<String>,
    output_path: PathBuf,
}

impl EngineCommand {
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// File the engine is expected to produce.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

/// Shell-style rendering, for logs only.
impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ffmpeg")?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Accumulates ffmpeg arguments in order.
#[derive(Debug, Default)]
pub struct EngineCommandBuilder {
    args: Vec<String>,
}

impl EngineCommandBuilder {
    /// Starts a command that overwrites its output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            args: vec!["-y".to_string()],
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn input(self, path: &Path) -> Self {
        self.arg("-i").arg(path.to_string_lossy())
    }

    /// Adds a lavfi-generated input.
    #[must_use]
    pub fn lavfi_input(self, source: &str) -> Self {
        self.args(["-f", "lavfi", "-i", source])
    }

    #[must_use]
    pub fn output(mut self, path: &Path) -> EngineCommand {
        self.args.push(path.to_string_lossy().into_owned());
        EngineCommand {
            args: self.args,
            output_path: path.to_path_buf(),
        }
    }
}

/// Builder for comma-separated filter chains.
#[derive(Default)]
pub struct VideoFilterChain {
    filters: Vec<String>,
}

impl VideoFilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter; empty strings are ignored.
    #[must_use]
    pub fn add_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.filters.push(filter);
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Option<String> {
        if self.filters.is_empty() {
            None
        } else {
            Some(self.filters.join(","))
        }
    }
}

/// Letterbox/pillarbox into exactly `target`, preserving aspect ratio.
#[must_use]
pub fn scale_pad_filter(target: Resolution) -> String {
    let (w, h) = (target.width, target.height);
    format!(
        "scale=w='if(gte(iw/ih,{w}/{h}),{w},-2)':h='if(gte(iw/ih,{w}/{h}),-2,{h})',\
         setsar=1,setdar=a,pad=w={w}:h={h}:x=-1:y=-1"
    )
}

/// Rotation then scale/pad, the video chain every compressed clip gets.
#[must_use]
pub fn video_chain(plan: &CompressionPlan) -> String {
    VideoFilterChain::new()
        .add_filter(transpose_filters(plan.user_rotation_degrees).unwrap_or_default())
        .add_filter(scale_pad_filter(plan.target_resolution))
        .build()
        .unwrap_or_default()
}

/// Filter graph that cuts the split windows and joins them.
#[must_use]
pub fn split_filter_graph(plan: &CompressionPlan, split: &SplittingPlan) -> String {
    let n = split.segments.len();
    let audio_input = match plan.audio_source {
        AudioSource::Original => "0:a:0",
        AudioSource::Silent => "1:a:0",
    };

    let mut parts = Vec::with_capacity(2 * n + 4);

    let video_taps: String = (0..n).map(|i| format!("[vs{i}]")).collect();
    let audio_taps: String = (0..n).map(|i| format!("[as{i}]")).collect();
    parts.push(format!("[0:v:0]split={n}{video_taps}"));
    parts.push(format!("[{audio_input}]asplit={n}{audio_taps}"));

    for (i, segment) in split.segments.iter().enumerate() {
        let start = format_seconds(segment.start);
        let duration = format_seconds(segment.duration);
        parts.push(format!(
            "[vs{i}]trim=start={start}:duration={duration},setpts=PTS-STARTPTS[v{i}]"
        ));
        parts.push(format!(
            "[as{i}]atrim=start={start}:duration={duration},asetpts=PTS-STARTPTS[a{i}]"
        ));
    }

    let video_labels: String = (0..n).map(|i| format!("[v{i}]")).collect();
    let audio_labels: String = (0..n).map(|i| format!("[a{i}]")).collect();
    parts.push(format!("{video_labels}concat=n={n}:v=1:a=0[vcat]"));
    parts.push(format!("{audio_labels}concat=n={n}:v=0:a=1[acat]"));
    parts.push(format!("[vcat]{}[vout]", video_chain(plan)));

    parts.join(";")
}

/// Builds the command compressing one clip according to `plan`.
#[must_use]
pub fn build_compression(plan: &CompressionPlan) -> EngineCommand {
    let mut builder = EngineCommandBuilder::new().input(&plan.input_path);
    if plan.audio_source == AudioSource::Silent {
        builder = builder.lavfi_input(SILENT_AUDIO_SOURCE);
    }

    builder = match &plan.splitting {
        Some(split) if !split.segments.is_empty() => builder
            .arg("-filter_complex")
            .arg(split_filter_graph(plan, split))
            .args(["-map", "[vout]", "-map", "[acat]"]),
        _ => {
            let audio_map = match plan.audio_source {
                AudioSource::Original => "0:a:0",
                AudioSource::Silent => "1:a:0",
            };
            builder
                .arg("-vf")
                .arg(video_chain(plan))
                .args(["-map", "0:v:0", "-map", audio_map])
        }
    };

    let quality = plan.quality;
    builder = builder
        .arg("-crf")
        .arg(quality.crf.to_string())
        .arg("-maxrate")
        .arg(format!("{}M", quality.max_rate_mbit))
        .arg("-bufsize")
        .arg(format!("{}M", quality.buffer_size_mbit()))
        .args(["-r", OUTPUT_FRAME_RATE])
        .args(["-c:v", "libx264", "-c:a", "aac", "-ar", "48000", "-b:a", "256k"])
        .args(["-movflags", "faststart", "-pix_fmt", "yuv420p", "-preset", "superfast"]);

    if plan.splitting.is_none() {
        if let Some(duration) = plan.target_duration {
            builder = builder.arg("-t").arg(format_seconds(duration));
        }
        if plan.audio_source == AudioSource::Silent {
            builder = builder.arg("-shortest");
        }
    }

    let command = builder.output(&plan.output_path);
    debug!("Compression command for '{}': {}", plan.clip_id, command);
    command
}

/// Escapes a path for a concat demuxer `file '...'` line.
#[must_use]
pub fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

/// Contents of the concat demuxer list: one `file '<path>'` line per input.
#[must_use]
pub fn concat_list_contents(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", escape_concat_path(p)))
        .collect()
}

/// Writes the list file, creating its directory if needed.
pub fn write_concat_list(list_path: &Path, paths: &[PathBuf]) -> CoreResult<()> {
    if let Some(parent) = list_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(list_path, concat_list_contents(paths))?;
    debug!("Wrote concat list with {} entries to {}", paths.len(), list_path.display());
    Ok(())
}

/// Writes the list file and builds the concatenation command.
pub fn build_concat(plan: &ConcatPlan) -> CoreResult<EngineCommand> {
    if plan.ordered_input_paths.is_empty() {
        return Err(CoreError::PlanningInvariant(
            "concatenation needs at least one input".to_string(),
        ));
    }
    write_concat_list(&plan.list_file_path, &plan.ordered_input_paths)?;

    let mut builder = EngineCommandBuilder::new()
        .args(["-f", "concat", "-safe", "0"])
        .input(&plan.list_file_path);

    builder = match &plan.audio_overlay {
        Some(overlay) => builder
            .args(["-stream_loop", "-1"])
            .input(&overlay.track_path)
            .arg("-filter_complex")
            .arg(format!(
                "[0:a]volume={}/100[aorg];[1:a]volume={}/100[atrk];\
                 [aorg][atrk]amix=inputs=2:duration=shortest[aout]",
                overlay.clip_volume_percent, overlay.track_volume_percent
            ))
            .args(["-map", "0:v", "-map", "[aout]", "-c:v", "copy", "-c:a", "aac"]),
        None => builder.args(["-c", "copy"]),
    };

    let command = builder.output(&plan.output_path);
    debug!("Concat command: {}", command);
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Orientation;
    use crate::planning::{AudioOverlay, QualityPreset, Segment};

    fn plan() -> CompressionPlan {
        CompressionPlan {
            clip_id: "c0".to_string(),
            input_path: PathBuf::from("/clips/in.mp4"),
            output_path: PathBuf::from("/cache/compressed/out.mp4"),
            target_resolution: Resolution::HD,
            target_orientation: Orientation::Horizontal,
            target_duration: Some(15.0),
            splitting: None,
            user_rotation_degrees: 0,
            audio_source: AudioSource::Original,
            quality: QualityPreset::HD,
        }
    }

    fn joined(cmd: &EngineCommand) -> String {
        cmd.args().join(" ")
    }

    #[test]
    fn scale_pad_filter_matches_box() {
        assert_eq!(
            scale_pad_filter(Resolution::new(720, 1280)),
            "scale=w='if(gte(iw/ih,720/1280),720,-2)':h='if(gte(iw/ih,720/1280),-2,1280)',\
             setsar=1,setdar=a,pad=w=720:h=1280:x=-1:y=-1"
        );
    }

    #[test]
    fn unsplit_command_layout() {
        let cmd = build_compression(&plan());
        let args = cmd.args();
        assert_eq!(&args[..3], ["-y", "-i", "/clips/in.mp4"]);
        let s = joined(&cmd);
        assert!(s.contains("-vf scale=w='if(gte(iw/ih,1280/720),1280,-2)'"));
        assert!(s.contains("-map 0:v:0 -map 0:a:0"));
        assert!(s.contains("-crf 24 -maxrate 6M -bufsize 12M -r 30000/1001"));
        assert!(s.contains("-c:v libx264 -c:a aac -ar 48000 -b:a 256k"));
        assert!(s.contains("-movflags faststart -pix_fmt yuv420p -preset superfast -t 15"));
        assert!(!s.contains("anullsrc"));
        assert_eq!(args.last().unwrap(), "/cache/compressed/out.mp4");
        assert_eq!(cmd.output_path(), Path::new("/cache/compressed/out.mp4"));
    }

    #[test]
    fn no_time_cap_without_target() {
        let mut p = plan();
        p.target_duration = None;
        assert!(!build_compression(&p).args().contains(&"-t".to_string()));
    }

    #[test]
    fn rotation_precedes_scaling() {
        let mut p = plan();
        p.user_rotation_degrees = -90;
        assert!(video_chain(&p).starts_with("transpose=2,scale="));
        p.user_rotation_degrees = 180;
        assert!(video_chain(&p).starts_with("transpose=1,transpose=1,scale="));
    }

    #[test]
    fn silent_clip_maps_generated_audio() {
        let mut p = plan();
        p.audio_source = AudioSource::Silent;
        let s = joined(&build_compression(&p));
        assert!(s.contains("-f lavfi -i anullsrc=channel_layout=stereo:sample_rate=48000"));
        assert!(s.contains("-map 1:a:0"));
        assert!(s.contains("-shortest"));
    }

    #[test]
    fn split_graph_cuts_and_joins() {
        let mut p = plan();
        p.splitting = Some(SplittingPlan {
            section_count: 2,
            section_duration: 5.0,
            segments: vec![
                Segment { start: 0.0, duration: 6.5 },
                Segment { start: 20.0, duration: 5.0 },
            ],
        });
        let cmd = build_compression(&p);
        let s = joined(&cmd);
        assert!(s.contains("-filter_complex"));
        assert!(s.contains("-map [vout] -map [acat]"));
        assert!(!s.contains(" -vf "));
        assert!(!s.contains(" -t "));

        let graph = split_filter_graph(&p, p.splitting.as_ref().unwrap());
        assert_eq!(
            graph,
            "[0:v:0]split=2[vs0][vs1];[0:a:0]asplit=2[as0][as1];\
             [vs0]trim=start=0:duration=6.5,setpts=PTS-STARTPTS[v0];\
             [as0]atrim=start=0:duration=6.5,asetpts=PTS-STARTPTS[a0];\
             [vs1]trim=start=20:duration=5,setpts=PTS-STARTPTS[v1];\
             [as1]atrim=start=20:duration=5,asetpts=PTS-STARTPTS[a1];\
             [v0][v1]concat=n=2:v=1:a=0[vcat];[a0][a1]concat=n=2:v=0:a=1[acat];\
             [vcat]scale=w='if(gte(iw/ih,1280/720),1280,-2)':h='if(gte(iw/ih,1280/720),-2,720)',\
             setsar=1,setdar=a,pad=w=1280:h=720:x=-1:y=-1[vout]"
        );
    }

    #[test]
    fn identical_plans_build_identical_commands() {
        assert_eq!(build_compression(&plan()), build_compression(&plan()));
        assert_eq!(build_compression(&plan()).to_string(), build_compression(&plan()).to_string());
    }

    #[test]
    fn display_quotes_shell_specials() {
        let cmd = EngineCommandBuilder::new()
            .input(Path::new("/clips/it's here.mp4"))
            .output(Path::new("/out/a.mp4"));
        assert_eq!(cmd.to_string(), r"ffmpeg -y -i '/clips/it'\''s here.mp4' /out/a.mp4");
    }

    #[test]
    fn concat_list_escapes_quotes() {
        let contents = concat_list_contents(&[
            PathBuf::from("/c/one.mp4"),
            PathBuf::from("/c/it's.mp4"),
        ]);
        assert_eq!(contents, "file '/c/one.mp4'\nfile '/c/it'\\''s.mp4'\n");
    }

    #[test]
    fn concat_without_overlay_stream_copies() {
        let dir = tempfile::tempdir().unwrap();
        let plan = ConcatPlan::new(
            &[dir.path().join("a.mp4"), dir.path().join("b.mp4")],
            None,
            dir.path().join("concat/list.txt"),
            dir.path().join("final.mp4"),
        )
        .unwrap();
        let cmd = build_concat(&plan).unwrap();
        let s = joined(&cmd);
        assert!(s.starts_with("-y -f concat -safe 0 -i "));
        assert!(s.ends_with(&format!("-c copy {}", dir.path().join("final.mp4").display())));

        let written = fs::read_to_string(dir.path().join("concat/list.txt")).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.lines().next().unwrap().ends_with("a.mp4'"));
    }

    #[test]
    fn concat_with_overlay_mixes_audio() {
        let dir = tempfile::tempdir().unwrap();
        let track = dir.path().join("music.mp3");
        let plan = ConcatPlan::new(
            &[dir.path().join("a.mp4")],
            Some(AudioOverlay {
                track_path: track.clone(),
                clip_volume_percent: 100,
                track_volume_percent: 20,
            }),
            dir.path().join("list.txt"),
            dir.path().join("final.mp4"),
        )
        .unwrap();
        let s = joined(&build_concat(&plan).unwrap());
        assert!(s.contains(&format!("-stream_loop -1 -i {}", track.display())));
        assert!(s.contains(
            "[0:a]volume=100/100[aorg];[1:a]volume=20/100[atrk];\
             [aorg][atrk]amix=inputs=2:duration=shortest[aout]"
        ));
        assert!(s.contains("-map 0:v -map [aout] -c:v copy -c:a aac"));
    }
}
