//! A lightweight terminal progress bar without external dependencies.
//!
//! Renders message, bar, pos/len, percentage, rate and ETA to stderr using
//! carriage-return redraws.

use std::{
	io::{self, Write},
	time::{Duration, Instant},
};

use super::ProgressTrait;

const BAR_WIDTH: usize = 30;
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

pub struct ProgressBar {
	message: String,
	len: u64,
	pos: u64,
	start: Instant,
	last_draw: Option<Instant>,
	finished: bool,
}

impl ProgressBar {
	fn redraw(&mut self, force: bool) {
		if self.finished {
			return;
		}
		let now = Instant::now();
		if !force {
			if let Some(last) = self.last_draw {
				if now - last < REDRAW_INTERVAL {
					return;
				}
			}
		}
		self.last_draw = Some(now);

		let len = self.len.max(1);
		let pos = self.pos.min(len);
		let filled = (pos as usize * BAR_WIDTH) / len as usize;
		let percent = pos * 100 / len;

		let elapsed = self.start.elapsed().as_secs_f64();
		let per_sec = if elapsed > 0.0 { pos as f64 / elapsed } else { 0.0 };
		let eta = if per_sec > 0.0 {
			format_duration(Duration::from_secs_f64((len - pos) as f64 / per_sec))
		} else {
			"--".to_string()
		};

		let mut stderr = io::stderr();
		let _ = write!(
			stderr,
			"\r\x1b[2K{} ▕{}{}▏{}/{} ({percent:>3}%) {per_sec:>6.1}/s eta {eta}",
			self.message,
			"█".repeat(filled),
			"░".repeat(BAR_WIDTH - filled),
			pos,
			len,
		);
		let _ = stderr.flush();
	}
}

fn format_duration(duration: Duration) -> String {
	let secs = duration.as_secs();
	if secs >= 3600 {
		format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
	} else if secs >= 60 {
		format!("{}m{:02}s", secs / 60, secs % 60)
	} else {
		format!("{secs}s")
	}
}

impl ProgressTrait for ProgressBar {
	fn new() -> Self {
		ProgressBar {
			message: String::new(),
			len: 0,
			pos: 0,
			start: Instant::now(),
			last_draw: None,
			finished: false,
		}
	}

	fn init(&mut self, message: &str, max_value: u64) {
		self.message = message.to_string();
		self.len = max_value;
		self.pos = 0;
		self.start = Instant::now();
		self.redraw(true);
	}

	fn set_position(&mut self, value: u64) {
		self.pos = value.min(self.len);
		self.redraw(false);
	}

	fn inc(&mut self, value: u64) {
		self.pos = (self.pos + value).min(self.len);
		self.redraw(false);
	}

	fn finish(&mut self) {
		self.pos = self.len;
		self.redraw(true);
		self.finished = true;
		let _ = writeln!(io::stderr());
	}
}
