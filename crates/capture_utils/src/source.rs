use crate::camera::InputSpec;
use crate::command::FfmpegCommand;
use crate::error::{CaptureError, CaptureResult};
use crate::probe::StreamInfo;
use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError,
};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use vision_core::interfaces::{Frame, FramePoll, FrameSource};

/// How often a reader blocked on a full queue re-checks the stop flag.
const SEND_RETRY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceOptions {
    /// Output size override; ffmpeg rescales when set.
    pub size: Option<(u32, u32)>,
    /// Requested device frame rate (avfoundation needs one).
    pub framerate: Option<f64>,
    /// Frames buffered between the reader thread and the consumer.
    pub queue: usize,
    /// Drop the oldest buffered frame instead of blocking the reader.
    /// Live cameras want this; offline files do not.
    pub drop_oldest: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            size: None,
            framerate: None,
            queue: 4,
            drop_oldest: true,
        }
    }
}

impl SourceOptions {
    pub fn for_input(input: &InputSpec) -> Self {
        Self {
            drop_oldest: input.is_live(),
            ..Self::default()
        }
    }
}

/// Frames decoded by an ffmpeg child process (or any raw rgb24 byte stream).
pub struct FfmpegSource {
    rx: Receiver<Frame>,
    size: (u32, u32),
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl FfmpegSource {
    pub fn command(ffmpeg: &Path, input: &InputSpec, opts: &SourceOptions) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(ffmpeg).args(["-hide_banner", "-loglevel", "error"]);
        if let (InputSpec::Camera(_), Some(rate)) = (input, opts.framerate) {
            cmd = cmd.arg("-framerate").arg(rate.to_string());
        }
        cmd = cmd.args(input.input_args());
        if let Some((w, h)) = opts.size {
            cmd = cmd.arg("-vf").arg(format!("scale={w}:{h}"));
        }
        cmd.args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
    }

    pub fn spawn(
        ffmpeg: &Path,
        input: &InputSpec,
        info: StreamInfo,
        opts: SourceOptions,
    ) -> CaptureResult<Self> {
        let size = opts.size.unwrap_or((info.width, info.height));
        let mut child = Self::command(ffmpeg, input, &opts).spawn(
            Stdio::null(),
            Stdio::piped(),
            Stdio::inherit(),
        )?;
        let stdout = child.stdout.take().ok_or_else(|| {
            CaptureError::Io(std::io::Error::other("ffmpeg stdout was not captured"))
        })?;
        tracing::info!(input = %input.describe(), width = size.0, height = size.1, "capture started");
        let mut source = Self::from_reader(stdout, size, opts);
        source.child = Some(child);
        Ok(source)
    }

    /// Split a raw rgb24 stream into frames on a reader thread.
    pub fn from_reader<R>(reader: R, size: (u32, u32), opts: SourceOptions) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = bounded(opts.queue.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));
        let handle = {
            let rx = rx.clone();
            let stop = stop.clone();
            let dropped = dropped.clone();
            thread::spawn(move || {
                read_frames(reader, size, &tx, &rx, opts.drop_oldest, &stop, &dropped)
            })
        };
        Self {
            rx,
            size,
            child: None,
            reader: Some(handle),
            stop,
            dropped,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Frames discarded because the consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn read_frames<R: Read>(
    mut reader: R,
    size: (u32, u32),
    tx: &Sender<Frame>,
    rx: &Receiver<Frame>,
    drop_oldest: bool,
    stop: &AtomicBool,
    dropped: &AtomicU64,
) {
    let frame_len = size.0 as usize * size.1 as usize * 3;
    let started = Instant::now();
    let mut id = 0u64;
    while !stop.load(Ordering::Relaxed) {
        let mut buf = vec![0u8; frame_len];
        if let Err(err) = reader.read_exact(&mut buf) {
            if err.kind() != ErrorKind::UnexpectedEof {
                tracing::warn!(%err, "frame read failed");
            }
            break;
        }
        let frame = match Frame::new(id, started.elapsed().as_secs_f64(), buf, size) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, "discarding malformed frame");
                break;
            }
        };
        id += 1;
        if !push_frame(tx, rx, frame, drop_oldest, stop, dropped) {
            break;
        }
    }
    tracing::debug!(frames = id, "frame reader finished");
}

fn push_frame(
    tx: &Sender<Frame>,
    rx: &Receiver<Frame>,
    frame: Frame,
    drop_oldest: bool,
    stop: &AtomicBool,
    dropped: &AtomicU64,
) -> bool {
    let mut frame = frame;
    if !drop_oldest {
        loop {
            match tx.send_timeout(frame, SEND_RETRY) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(back)) => {
                    if stop.load(Ordering::Relaxed) {
                        return false;
                    }
                    frame = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        match tx.try_send(frame) {
            Ok(()) => return true,
            Err(TrySendError::Full(back)) => {
                if rx.try_recv().is_ok() {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
                frame = back;
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> Option<Frame> {
        self.rx.recv().ok()
    }

    fn poll_frame(&mut self, timeout: Duration) -> FramePoll {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => FramePoll::Ready(frame),
            Err(RecvTimeoutError::Timeout) => FramePoll::Pending,
            Err(RecvTimeoutError::Disconnected) => FramePoll::Ended,
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let Some(mut child) = self.child.take() else {
            // Nothing can interrupt a caller-supplied reader blocked in
            // `read`; join it only once it has exited, otherwise detach.
            while self.rx.try_recv().is_ok() {}
            if let Some(handle) = self.reader.take() {
                if handle.is_finished() {
                    let _ = handle.join();
                } else {
                    tracing::debug!("frame reader still blocked in read; detaching");
                }
            }
            return;
        };
        let _ = child.kill();
        // Unblock a reader waiting on a full channel, then wait for EOF.
        while self.rx.recv().is_ok() {}
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        let _ = child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn raw_frames(n: u8, size: (u32, u32)) -> Vec<u8> {
        let len = (size.0 * size.1 * 3) as usize;
        (0..n).flat_map(|i| vec![i; len]).collect()
    }

    #[test]
    fn splits_stream_into_sized_frames() {
        let size = (4, 2);
        let opts = SourceOptions {
            drop_oldest: false,
            ..SourceOptions::default()
        };
        let mut source = FfmpegSource::from_reader(Cursor::new(raw_frames(3, size)), size, opts);
        let frames: Vec<Frame> = std::iter::from_fn(|| source.next_frame()).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames.iter().map(|f| f.id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(frames[2].rgb.iter().all(|&b| b == 2));
        assert_eq!(frames[0].size, size);
    }

    #[test]
    fn partial_trailing_frame_is_discarded() {
        let size = (2, 2);
        let mut bytes = raw_frames(1, size);
        bytes.extend_from_slice(&[9; 5]);
        let opts = SourceOptions {
            drop_oldest: false,
            ..SourceOptions::default()
        };
        let mut source = FfmpegSource::from_reader(Cursor::new(bytes), size, opts);
        assert!(source.next_frame().is_some());
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn live_queue_keeps_newest_frames() {
        let size = (1, 1);
        let opts = SourceOptions {
            queue: 2,
            drop_oldest: true,
            ..SourceOptions::default()
        };
        let mut source = FfmpegSource::from_reader(Cursor::new(raw_frames(10, size)), size, opts);
        // Let the reader run ahead of the consumer.
        while source.reader.as_ref().is_some_and(|h| !h.is_finished()) {
            thread::yield_now();
        }
        let frames: Vec<Frame> = std::iter::from_fn(|| source.next_frame()).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames.last().map(|f| f.id), Some(9));
        assert_eq!(source.dropped(), 8);
    }

    /// Blocks in `read` until the paired sender is dropped, then reports EOF.
    struct StalledReader(std::sync::mpsc::Receiver<()>);

    impl Read for StalledReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    #[test]
    fn poll_reports_pending_while_reader_stalls() {
        let (release, stalled) = std::sync::mpsc::channel::<()>();
        let mut source =
            FfmpegSource::from_reader(StalledReader(stalled), (2, 2), SourceOptions::default());
        let started = Instant::now();
        assert!(matches!(
            source.poll_frame(Duration::from_millis(50)),
            FramePoll::Pending
        ));
        assert!(started.elapsed() < Duration::from_secs(2));

        drop(release);
        assert!(matches!(
            source.poll_frame(Duration::from_secs(5)),
            FramePoll::Ended
        ));
    }

    #[test]
    fn dropping_source_does_not_wait_for_stalled_reader() {
        let (release, stalled) = std::sync::mpsc::channel::<()>();
        let source =
            FfmpegSource::from_reader(StalledReader(stalled), (2, 2), SourceOptions::default());
        let started = Instant::now();
        drop(source);
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(release);
    }

    #[test]
    fn offline_reader_waiting_on_full_queue_sees_stop() {
        let size = (1, 1);
        let opts = SourceOptions {
            queue: 1,
            drop_oldest: false,
            ..SourceOptions::default()
        };
        let mut source = FfmpegSource::from_reader(Cursor::new(raw_frames(10, size)), size, opts);
        // The reader fills the single slot and then waits to send frame 1.
        thread::sleep(Duration::from_millis(50));
        source.stop.store(true, Ordering::Relaxed);
        let handle = source.reader.take().unwrap();
        let started = Instant::now();
        while !handle.is_finished() {
            assert!(started.elapsed() < Duration::from_secs(2), "reader ignored stop");
            thread::sleep(Duration::from_millis(10));
        }
        handle.join().unwrap();
        assert_eq!(source.next_frame().map(|f| f.id), Some(0));
    }

    #[test]
    fn command_requests_rawvideo_rgb24() {
        let input = InputSpec::File(PathBuf::from("in.mp4"));
        let opts = SourceOptions {
            size: Some((320, 240)),
            ..SourceOptions::for_input(&input)
        };
        let cmd = FfmpegSource::command(Path::new("ffmpeg"), &input, &opts);
        let joined = cmd.args.join(" ");
        assert!(joined.contains("-i in.mp4 -vf scale=320:240"));
        assert!(joined.ends_with("-f rawvideo -pix_fmt rgb24 -"));
        assert!(!opts.drop_oldest);
    }
}
