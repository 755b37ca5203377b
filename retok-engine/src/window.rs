//! Window planning
//!
//! Inputs longer than the model's context are split into windows whose core
//! regions tile the input. Every window additionally carries up to
//! `context_size` characters of context on each side; the context is sent to
//! the model but only the core is authoritative for the merged result.
//!
//! All offsets are character offsets, not byte offsets.

use crate::error::ConfigError;
use std::ops::Range;

/// Number of marker slots (begin and end) every model sequence reserves.
pub const MARKER_SLOTS: usize = 2;

/// Window geometry derived from the model's context budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    max_length: usize,
    window_size: usize,
    context_size: usize,
}

impl WindowGeometry {
    /// Geometry for a model that accepts `capacity` positions including the
    /// begin/end markers.
    pub fn from_model_capacity(capacity: usize) -> Result<Self, ConfigError> {
        if capacity <= MARKER_SLOTS {
            return Err(ConfigError::CapacityTooSmall { capacity });
        }
        Self::from_max_length(capacity - MARKER_SLOTS)
    }

    /// Geometry for `max_length` characters per model call, using three
    /// quarters of the budget as window core.
    pub fn from_max_length(max_length: usize) -> Result<Self, ConfigError> {
        let window_size = (3 * max_length).div_ceil(4);
        Self::new(max_length, window_size)
    }

    /// Geometry with an explicit window size
    pub fn new(max_length: usize, window_size: usize) -> Result<Self, ConfigError> {
        if window_size == 0 || window_size > max_length {
            return Err(ConfigError::InvalidWindowSize {
                window_size,
                max_length,
            });
        }

        Ok(Self {
            max_length,
            window_size,
            context_size: (max_length - window_size) / 2,
        })
    }

    /// Maximum characters sent to the model in one sequence
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Core length of every window but the last
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Context characters attached on each side of a core
    pub fn context_size(&self) -> usize {
        self.context_size
    }

    /// Plan the windows for an input of `input_length` characters
    pub fn plan(&self, input_length: usize) -> WindowPlan {
        if input_length <= self.max_length {
            return WindowPlan::single(input_length, self.window_size, self.context_size);
        }

        WindowPlan::from_starts(
            input_length,
            self.window_size,
            self.context_size,
            WindowPlan::sliding_window_starts(input_length, self.window_size),
        )
    }
}

/// One window of an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Position of the window within its plan
    pub index: usize,
    /// First character of the core
    pub start: usize,
    /// One past the last character of the core
    pub end: usize,
    /// First character sent to the model
    pub context_start: usize,
    /// One past the last character sent to the model
    pub context_end: usize,
}

impl Window {
    /// Core region in input coordinates
    pub fn core(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Expanded region (core plus context) in input coordinates
    pub fn expanded(&self) -> Range<usize> {
        self.context_start..self.context_end
    }

    /// Core length
    pub fn core_len(&self) -> usize {
        self.end - self.start
    }

    /// Length of the sequence sent to the model
    pub fn expanded_len(&self) -> usize {
        self.context_end - self.context_start
    }

    /// Characters of left context in front of the core
    pub fn left_context_len(&self) -> usize {
        self.start - self.context_start
    }
}

/// Ordered windows covering one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowPlan {
    input_length: usize,
    window_size: usize,
    context_size: usize,
    windows: Vec<Window>,
}

impl WindowPlan {
    fn single(input_length: usize, window_size: usize, context_size: usize) -> Self {
        Self {
            input_length,
            window_size,
            context_size,
            windows: vec![Window {
                index: 0,
                start: 0,
                end: input_length,
                context_start: 0,
                context_end: input_length,
            }],
        }
    }

    /// Window start offsets spaced by `window_size`
    pub fn sliding_window_starts(length: usize, window_size: usize) -> Vec<usize> {
        (0..length).step_by(window_size.max(1)).collect()
    }

    /// Build a plan from explicit start offsets.
    ///
    /// The cores are `start..min(start + window_size, input_length)`; nothing
    /// checks that they tile the input. The merger reports any gap or overlap.
    pub fn from_starts(
        input_length: usize,
        window_size: usize,
        context_size: usize,
        starts: Vec<usize>,
    ) -> Self {
        let windows = starts
            .into_iter()
            .enumerate()
            .map(|(index, start)| {
                let start = start.min(input_length);
                let end = (start + window_size).min(input_length);
                Window {
                    index,
                    start,
                    end,
                    context_start: start.saturating_sub(context_size),
                    context_end: (end + context_size).min(input_length),
                }
            })
            .collect();

        Self {
            input_length,
            window_size,
            context_size,
            windows,
        }
    }

    /// Length of the planned input in characters
    pub fn input_length(&self) -> usize {
        self.input_length
    }

    /// Core length used for planning
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Context length used for planning
    pub fn context_size(&self) -> usize {
        self.context_size
    }

    /// The windows in left-to-right order
    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Number of windows
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// True if the plan has no windows
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// True if the input is sent to the model unsplit
    pub fn is_single(&self) -> bool {
        self.windows.len() == 1
    }
}
