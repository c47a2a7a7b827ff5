//! Injected metrics handle.
//!
//! Components receive a [`Meter`] at construction instead of reaching for the
//! process-wide `metrics` recorder, so each one can be exercised against its
//! own recorder in tests.

use std::fmt;
use std::sync::Arc;

use metrics::{Counter, Histogram, Key, Label, Level, Metadata, NoopRecorder, Recorder, Unit};

/// Cloneable handle to a metrics recorder.
#[derive(Clone)]
pub struct Meter {
    recorder: Arc<dyn Recorder + Send + Sync>,
}

impl Meter {
    /// Wraps a recorder.
    pub fn new<R>(recorder: R) -> Self
    where
        R: Recorder + Send + Sync + 'static,
    {
        Self {
            recorder: Arc::new(recorder),
        }
    }

    /// A meter that discards every sample.
    pub fn noop() -> Self {
        Self::new(NoopRecorder)
    }

    /// Registers (or looks up) a counter with the given label set.
    pub fn counter<I>(&self, name: &'static str, labels: I) -> Counter
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        self.recorder
            .register_counter(&key(name, labels), &metadata())
    }

    /// Registers (or looks up) a histogram with the given label set.
    pub fn histogram<I>(&self, name: &'static str, labels: I) -> Histogram
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        self.recorder
            .register_histogram(&key(name, labels), &metadata())
    }

    pub fn describe_counter(&self, name: &'static str, description: &'static str) {
        self.recorder
            .describe_counter(name.into(), Some(Unit::Count), description.into());
    }

    pub fn describe_histogram(&self, name: &'static str, description: &'static str) {
        self.recorder
            .describe_histogram(name.into(), Some(Unit::Seconds), description.into());
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meter").finish_non_exhaustive()
    }
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

fn key<I>(name: &'static str, labels: I) -> Key
where
    I: IntoIterator<Item = (&'static str, String)>,
{
    let labels: Vec<Label> = labels
        .into_iter()
        .map(|(k, v)| Label::new(k, v))
        .collect();
    Key::from_parts(name, labels)
}
