use std::{
    fs::{create_dir_all, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::Context;

type Sink = Box<dyn Write + Send>;

struct ProfilerInner {
    sink: Mutex<Sink>,
    frame_counter: AtomicU64,
}

/// CSV section timings, one row per `(frame, section)`.
#[derive(Clone)]
pub struct Profiler {
    inner: Arc<ProfilerInner>,
}

#[derive(Clone)]
pub struct FrameCtx {
    inner: Arc<ProfilerInner>,
    frame_index: u64,
}

pub struct SectionGuard {
    inner: Arc<ProfilerInner>,
    frame_index: u64,
    label: &'static str,
    start: Instant,
}

impl Drop for SectionGuard {
    fn drop(&mut self) {
        write_line(&self.inner, self.frame_index, self.label, self.start.elapsed());
    }
}

impl Profiler {
    /// Opens `dir/profile_<unix seconds>.csv`.
    pub fn create_in(dir: impl AsRef<Path>) -> anyhow::Result<(Self, PathBuf)> {
        let dir = dir.as_ref();
        create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0))
            .as_secs();
        let path = dir.join(format!("profile_{timestamp}.csv"));
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let profiler = Self::with_writer(Box::new(BufWriter::new(file)))?;
        Ok((profiler, path))
    }

    pub fn with_writer(mut sink: Sink) -> anyhow::Result<Self> {
        writeln!(sink, "frame,section,duration_ms").context("writing profile header")?;
        Ok(Self {
            inner: Arc::new(ProfilerInner {
                sink: Mutex::new(sink),
                frame_counter: AtomicU64::new(0),
            }),
        })
    }

    pub fn begin_frame(&self) -> FrameCtx {
        FrameCtx {
            inner: self.inner.clone(),
            frame_index: self.inner.frame_counter.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn frames(&self) -> u64 {
        self.inner.frame_counter.load(Ordering::Relaxed)
    }

    pub fn flush(&self) {
        if let Ok(mut sink) = self.inner.sink.lock() {
            let _ = sink.flush();
        }
    }
}

impl FrameCtx {
    pub fn index(&self) -> u64 {
        self.frame_index
    }

    pub fn section(&self, label: &'static str) -> SectionGuard {
        SectionGuard {
            inner: self.inner.clone(),
            frame_index: self.frame_index,
            label,
            start: Instant::now(),
        }
    }

    pub fn scope<F, R>(&self, label: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.section(label);
        f()
    }
}

/// Times `f` under `label` when profiling is on, otherwise just runs it.
pub fn scope<F, R>(ctx: &Option<FrameCtx>, label: &'static str, f: F) -> R
where
    F: FnOnce() -> R,
{
    match ctx {
        Some(frame) => frame.scope(label, f),
        None => f(),
    }
}

fn write_line(inner: &ProfilerInner, frame: u64, section: &'static str, duration: Duration) {
    if let Ok(mut sink) = inner.sink.lock() {
        let _ = writeln!(sink, "{},{},{:.6}", frame, section, duration.as_secs_f64() * 1000.0);
    }
}
