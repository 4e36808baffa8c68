//! ffmpeg argument construction

use std::ffi::OsString;

use crate::domain::errors::DomainError;
use crate::domain::model::{HalfOpenTrimPolicy, ProcessingParams};

/// Output encoding settings shared by every job
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingOptions {
    pub video_codec: String,
    pub audio_codec: String,
    /// Pass `-y` so an existing output is replaced
    pub overwrite: bool,
    pub half_open_trim: HalfOpenTrimPolicy,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            overwrite: true,
            half_open_trim: HalfOpenTrimPolicy::Reject,
        }
    }
}

/// Build the ordered ffmpeg argument list for a request.
///
/// Layout: `-i <input> [-ss <start>] [-to <end>] [-vf subtitles=...]
/// -c:v <codec> -c:a <codec> [-y] <output>`. Trim values are rendered
/// verbatim from the request.
pub fn build_ffmpeg_args(
    params: &ProcessingParams,
    options: &EncodingOptions,
) -> Result<Vec<OsString>, DomainError> {
    params.validate(options.half_open_trim)?;

    let mut args: Vec<OsString> = vec!["-i".into(), params.input_file.clone().into()];

    if let Some(start) = params.start_time {
        args.push("-ss".into());
        args.push(start.to_string().into());
    }
    if let Some(end) = params.end_time {
        args.push("-to".into());
        args.push(end.to_string().into());
    }

    if let Some(ref subtitle_file) = params.subtitle_file {
        let path = subtitle_file.to_str().ok_or_else(|| {
            DomainError::BadArgs(format!(
                "Subtitle path is not valid UTF-8: {}",
                subtitle_file.display()
            ))
        })?;
        args.push("-vf".into());
        args.push(subtitles_filter(path).into());
    }

    args.push("-c:v".into());
    args.push(options.video_codec.clone().into());
    args.push("-c:a".into());
    args.push(options.audio_codec.clone().into());
    if options.overwrite {
        args.push("-y".into());
    }
    args.push(params.output_file.clone().into());

    Ok(args)
}

/// `subtitles` filter burning in the given file
pub fn subtitles_filter(path: &str) -> String {
    format!("subtitles=filename={}", escape_filter_graph(&escape_filter_option(path)))
}

/// Escape a value for use inside a filter's option list
pub fn escape_filter_option(value: &str) -> String {
    escape_chars(value, &['\\', '\'', ':'])
}

/// Escape a filter description for use inside a filter graph
pub fn escape_filter_graph(value: &str) -> String {
    escape_chars(value, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn build(params: &ProcessingParams) -> Vec<String> {
        strings(build_ffmpeg_args(params, &EncodingOptions::default()).unwrap())
    }

    #[test]
    fn test_trim_range_values_are_verbatim() {
        for (start, end) in [(10.0, 20.0), (0.0, 0.5), (12.345, 99.9), (3600.0, 7200.25)] {
            let params = ProcessingParams::new("/in/a.mp4", "/out/b.mp4").with_trim(start, end);
            let args = build(&params);

            let ss = args.iter().position(|a| a == "-ss").unwrap();
            let to = args.iter().position(|a| a == "-to").unwrap();
            assert_eq!(args[ss + 1].parse::<f64>().unwrap(), start);
            assert_eq!(args[to + 1].parse::<f64>().unwrap(), end);
            assert_eq!(to, ss + 2);
        }
    }

    #[test]
    fn test_full_argument_layout() {
        let params = ProcessingParams::new("a.mp4", "b.mp4").with_trim(10.0, 20.0);
        assert_eq!(
            build(&params),
            vec![
                "-i", "a.mp4", "-ss", "10", "-to", "20", "-c:v", "libx264", "-c:a", "aac", "-y",
                "b.mp4"
            ]
        );
    }

    #[test]
    fn test_no_trim_arguments_without_bounds() {
        let args = build(&ProcessingParams::new("a.mp4", "b.mp4"));
        assert!(!args.iter().any(|a| a == "-ss" || a == "-to"));
        assert_eq!(args.first().map(String::as_str), Some("-i"));
        assert_eq!(args.last().map(String::as_str), Some("b.mp4"));
    }

    #[test]
    fn test_half_open_range_rejected_by_default() {
        let mut params = ProcessingParams::new("a.mp4", "b.mp4");
        params.end_time = Some(30.0);

        let err = build_ffmpeg_args(&params, &EncodingOptions::default()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTimeRange(_)));
    }

    #[test]
    fn test_half_open_range_allowed_emits_single_bound() {
        let options = EncodingOptions {
            half_open_trim: HalfOpenTrimPolicy::Allow,
            ..EncodingOptions::default()
        };
        let mut params = ProcessingParams::new("a.mp4", "b.mp4");
        params.start_time = Some(4.5);

        let args = strings(build_ffmpeg_args(&params, &options).unwrap());
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "4.5");
        assert!(!args.iter().any(|a| a == "-to"));
    }

    #[test]
    fn test_subtitle_filter_plain_path() {
        let params = ProcessingParams::new("a.mp4", "b.mp4").with_subtitles("/subs/movie.srt");
        let args = build(&params);
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "subtitles=filename=/subs/movie.srt");
    }

    #[test]
    fn test_subtitle_filter_escapes_windows_path() {
        assert_eq!(
            subtitles_filter(r"C:\subs\a.srt"),
            r"subtitles=filename=C\\:\\\\subs\\\\a.srt"
        );
    }

    #[test]
    fn test_subtitle_filter_escapes_graph_metacharacters() {
        assert_eq!(escape_filter_option("it's:here"), r"it\'s\:here");
        assert_eq!(escape_filter_graph("[a],b;c"), r"\[a\]\,b\;c");
        assert_eq!(
            subtitles_filter("/tmp/it's [1],x;y.srt"),
            r"subtitles=filename=/tmp/it\\\'s \[1\]\,x\;y.srt"
        );
    }

    #[test]
    fn test_codecs_and_overwrite_follow_options() {
        let options = EncodingOptions {
            video_codec: "libx265".to_string(),
            audio_codec: "copy".to_string(),
            overwrite: false,
            ..EncodingOptions::default()
        };
        let args = strings(
            build_ffmpeg_args(&ProcessingParams::new("a.mp4", "b.mkv"), &options).unwrap(),
        );
        assert_eq!(
            args,
            vec!["-i", "a.mp4", "-c:v", "libx265", "-c:a", "copy", "b.mkv"]
        );
    }

    #[test]
    fn test_builder_is_deterministic() {
        let params = ProcessingParams::new("a.mp4", "b.mp4")
            .with_trim(1.0, 2.0)
            .with_subtitles("s.ass");
        assert_eq!(build(&params), build(&params));
    }
}
