use common::{CameraSettings, CameraStreamConfig};

/// Bare flag disabling audio entirely.
pub const NO_AUDIO_FLAG: &str = "-an";

/// Fixed audio encode bundle installed when audio is enabled.
const AUDIO_BUNDLE: [(&str, &str); 4] = [
    ("-codec:a", "mp2"),
    ("-ar", "44100"),
    ("-ac", "1"),
    ("-b:a", "128k"),
];

/// Fixed output container and video codec, emitted right after the input.
const OUTPUT_ARGS: [&str; 4] = ["-f", "mpegts", "-codec:v", "mpeg1video"];

/// Fixed quality/muxing/banner flags plus the stdout output marker.
const TAIL_ARGS: [&str; 6] = [
    "-q",
    "1",
    "-max_muxing_queue_size",
    "1024",
    "-hide_banner",
    "pipe:1",
];

/// Ordered flag-to-value container. Insertion order is preserved so the
/// emitted argument list is deterministic for a given state.
///
/// `set` keeps one entry per flag; `push` allows repeats for flags the
/// transcoder accepts more than once (the audio `-map` selector).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    entries: Vec<(String, String)>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the flag, or overwrite the first existing entry for it.
    pub fn set(&mut self, flag: impl Into<String>, value: impl Into<String>) {
        let flag = flag.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(f, _)| *f == flag) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((flag, value)),
        }
    }

    /// Append unconditionally, allowing duplicate flags.
    pub fn push(&mut self, flag: impl Into<String>, value: impl Into<String>) {
        self.entries.push((flag.into(), value.into()));
    }

    /// Remove every entry for the flag.
    pub fn remove(&mut self, flag: &str) {
        self.entries.retain(|(f, _)| f != flag);
    }

    /// Remove the first entry matching the exact flag/value pair.
    pub fn remove_entry(&mut self, flag: &str, value: &str) {
        if let Some(idx) = self
            .entries
            .iter()
            .position(|(f, v)| f == flag && v == value)
        {
            self.entries.remove(idx);
        }
    }

    pub fn get(&self, flag: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == flag)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.entries.iter().any(|(f, _)| f == flag)
    }

    pub fn count(&self, flag: &str) -> usize {
        self.entries.iter().filter(|(f, _)| f == flag).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mutable per-session stream configuration: the current input source plus
/// the ordered flag set, layered as base config < persisted override <
/// runtime mutation.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    source: String,
    pub flags: OptionSet,
    audio_map: Option<String>,
}

impl StreamOptions {
    /// Base layer, derived once from the camera's declarative config.
    pub fn from_config(config: &CameraStreamConfig) -> Self {
        let mut flags = OptionSet::new();
        flags.set("-s", format!("{}x{}", config.max_width, config.max_height));
        flags.set("-b:v", config.max_bitrate.to_string());
        flags.set("-r", config.max_fps.to_string());
        flags.set("-bf", "0");
        flags.set("-preset", config.encoder_preset.clone());
        flags.set("-threads", "1");
        flags.set("-loglevel", "error");
        if let Some(map) = &config.video_map {
            flags.set("-map", map.clone());
        }
        if let Some(filter) = &config.video_filter {
            flags.set("-vf", filter.clone());
        }

        let mut options = Self {
            source: config.input.clone(),
            flags,
            audio_map: config.audio_map.clone(),
        };
        if config.audio {
            options.enable_audio();
        }
        options
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replace the input source. Rejected (returning false, prior value
    /// kept) unless the new value carries the "-i" input marker.
    pub fn set_source(&mut self, source: &str) -> bool {
        if !has_input_marker(source) {
            return false;
        }
        self.source = source.to_string();
        true
    }

    /// Install the audio bundle and drop any no-audio marker.
    pub fn enable_audio(&mut self) {
        self.flags.remove(NO_AUDIO_FLAG);
        for (flag, value) in AUDIO_BUNDLE {
            self.flags.set(flag, value);
        }
        if let Some(map) = self.audio_map.clone() {
            let present = self.flags.iter().any(|(f, v)| f == "-map" && v == map);
            if !present {
                self.flags.push("-map", map);
            }
        }
    }

    /// Strip the audio bundle (including the audio map entry) and install
    /// a single bare no-audio marker.
    pub fn disable_audio(&mut self) {
        for (flag, _) in AUDIO_BUNDLE {
            self.flags.remove(flag);
        }
        if let Some(map) = self.audio_map.clone() {
            self.flags.remove_entry("-map", &map);
        }
        self.flags.set(NO_AUDIO_FLAG, "");
    }

    /// Override layer: apply a persisted per-camera settings record.
    pub fn apply_settings(&mut self, record: &CameraSettings) {
        if let Some(resolution) = &record.resolution {
            self.flags.set("-s", resolution.clone());
        }
        match record.audio {
            Some(true) => self.enable_audio(),
            Some(false) => self.disable_audio(),
            None => {}
        }
    }

    /// Runtime layer: merge arbitrary flag/value pairs.
    pub fn merge<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (flag, value) in pairs {
            self.flags.set(flag, value);
        }
    }

    /// Runtime layer: remove named flags entirely.
    pub fn remove_flags<I, S>(&mut self, flags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for flag in flags {
            self.flags.remove(flag.as_ref());
        }
    }

    /// Final assembly: source tokens, fixed output format/codec, the flag
    /// set in insertion order, fixed tail flags, output to stdout. Empty
    /// tokens are dropped, which is how a bare flag emits without a value.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self.source.split_whitespace().map(str::to_string).collect();
        args.extend(OUTPUT_ARGS.iter().map(|s| s.to_string()));
        for (flag, value) in self.flags.iter() {
            args.push(flag.to_string());
            args.push(value.to_string());
        }
        args.extend(TAIL_ARGS.iter().map(|s| s.to_string()));
        args.retain(|token| !token.is_empty());
        args
    }
}

fn has_input_marker(source: &str) -> bool {
    source.split_whitespace().any(|token| token == "-i")
}
