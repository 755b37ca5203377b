//! Tokenization repairer and builder
//!
//! Entry point of the engine: cleans the inputs, schedules their windows,
//! runs the adapter batch by batch, routes every result to its
//! `(input_index, window_position)` slot, merges and renders.

use crate::{
    adapter::{InferenceAdapter, InferenceRequest, TaskOptions},
    assembler::ResultMerger,
    clean::{clean_sequence, CharIndex},
    config::{RepairConfig, RepairConfigBuilder},
    error::{RepairError, Result},
    inference::InferenceResult,
    input::{RepairInput, RepairOutput},
    progress::ProgressObserver,
    render::render,
    scheduler::{BatchScheduler, Schedule},
    vocab::CharVocabulary,
};
use std::{
    collections::VecDeque,
    fs,
    io::{BufWriter, Write},
    path::Path,
};
use tracing::{debug, info};

/// Window results of one input, indexed by window position
type Slots = Vec<Option<InferenceResult>>;

/// Repairs the tokenization of text with a sequence model.
///
/// Inputs longer than the model's context are split into overlapping
/// windows; only the core of each window contributes to the result.
pub struct TokenizationRepairer<A> {
    adapter: A,
    config: RepairConfig,
    options: TaskOptions,
    scheduler: BatchScheduler,
    progress: Option<Box<dyn ProgressObserver>>,
}

impl<A: InferenceAdapter> TokenizationRepairer<A> {
    /// Create a repairer, validating `config` against the adapter
    pub fn new(adapter: A, config: RepairConfig) -> Result<Self> {
        let task = adapter.task();
        config.validate_for(task, adapter.vocabulary().is_some())?;

        Ok(Self {
            options: config.options_for(task),
            scheduler: BatchScheduler::new(config.geometry, config.batch_size, config.sort_by_length),
            adapter,
            config,
            progress: None,
        })
    }

    /// Create a builder around `adapter`
    pub fn builder(adapter: A) -> TokenizationRepairerBuilder<A> {
        TokenizationRepairerBuilder::new(adapter)
    }

    /// Attach a progress observer; it is only notified when
    /// `show_progress` is set
    pub fn with_progress<P: ProgressObserver + 'static>(mut self, observer: P) -> Self {
        self.progress = Some(Box::new(observer));
        self
    }

    /// The configuration in use
    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    /// The adapter in use
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Vocabulary of the adapter, for callers that render raw results
    pub fn vocabulary(&self) -> Option<&CharVocabulary> {
        self.adapter.vocabulary()
    }

    /// Repair a single string or a batch, preserving the input's shape
    pub fn repair(&self, input: RepairInput) -> Result<RepairOutput> {
        match input {
            RepairInput::Text(text) => self.repair_text(&text).map(RepairOutput::Text),
            RepairInput::Batch(texts) => self
                .repair_batch(texts.as_slice())
                .map(RepairOutput::Batch),
        }
    }

    /// Repair a single string
    pub fn repair_text(&self, text: &str) -> Result<String> {
        let mut repaired = self.repair_batch(&[text])?;
        repaired.pop().ok_or(RepairError::AdapterContract {
            expected: 1,
            actual: 0,
        })
    }

    /// Repair several strings; the output is in input order
    pub fn repair_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<String>> {
        let cleaned: Vec<String> = texts.iter().map(|t| clean_sequence(t.as_ref())).collect();
        let results = self.run(&cleaned)?;
        let vocabulary = self.vocabulary();

        results
            .iter()
            .zip(&cleaned)
            .enumerate()
            .map(|(input_index, (result, input))| {
                render(result, input, vocabulary)
                    .map_err(|source| RepairError::Render { input_index, source })
            })
            .collect()
    }

    /// Merged model results for each input, before rendering.
    ///
    /// Result `i` spans the cleaned form of `inputs[i]`, markers included.
    pub fn repair_raw<S: AsRef<str>>(&self, inputs: &[S]) -> Result<Vec<InferenceResult>> {
        let cleaned: Vec<String> = inputs.iter().map(|t| clean_sequence(t.as_ref())).collect();
        self.run(&cleaned)
    }

    /// Lazily repair the items of an iterator, `batch_size` items at a time
    pub fn repair_iter<I>(&self, texts: I) -> RepairIter<'_, A, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        RepairIter {
            repairer: self,
            texts: texts.into_iter(),
            buffer: VecDeque::new(),
            failed: false,
        }
    }

    /// Repair a line-oriented file. Every line is trimmed and repaired; the
    /// repaired lines are written newline-terminated to `output` if given and
    /// returned either way.
    pub fn repair_file(&self, input: &Path, output: Option<&Path>) -> Result<Vec<String>> {
        let content = fs::read_to_string(input)?;
        let lines: Vec<&str> = content.lines().map(str::trim).collect();

        let repaired = if lines.is_empty() {
            Vec::new()
        } else {
            self.repair_batch(lines.as_slice())?
        };

        if let Some(path) = output {
            let mut writer = BufWriter::new(fs::File::create(path)?);
            for line in &repaired {
                writeln!(writer, "{line}")?;
            }
            writer.flush()?;
        }

        Ok(repaired)
    }

    fn run(&self, inputs: &[String]) -> Result<Vec<InferenceResult>> {
        if inputs.is_empty() {
            return Err(RepairError::InvalidInput {
                reason: "no inputs given".to_string(),
            });
        }

        let schedule = self.scheduler.schedule(inputs);
        info!(
            inputs = inputs.len(),
            windows = schedule.entries().len(),
            batches = schedule.num_batches(),
            "repairing inputs"
        );

        let slots = self.infer_all(inputs, &schedule)?;
        self.merge_all(inputs, &schedule, slots)
    }

    fn infer_all(&self, inputs: &[String], schedule: &Schedule) -> Result<Vec<Slots>> {
        let indices: Vec<CharIndex<'_>> = inputs.iter().map(|s| CharIndex::new(s)).collect();
        let mut arena: Vec<Slots> = schedule
            .window_counts()
            .into_iter()
            .map(|count| vec![None; count])
            .collect();

        let progress = self
            .progress
            .as_deref()
            .filter(|_| self.config.show_progress);
        if let Some(progress) = progress {
            progress.start(schedule.total_chars());
        }

        for (batch_index, batch) in schedule.batches().enumerate() {
            let sequences: Vec<&str> = batch
                .iter()
                .map(|entry| indices[entry.input_index].slice(entry.context_start..entry.context_end))
                .collect();
            let chars: usize = batch.iter().map(|entry| entry.len()).sum();

            let request = InferenceRequest::new(sequences, &self.options);
            let outputs = self
                .adapter
                .infer(&request)
                .map_err(|source| RepairError::Adapter { source })?;
            if outputs.len() != batch.len() {
                return Err(RepairError::AdapterContract {
                    expected: batch.len(),
                    actual: outputs.len(),
                });
            }

            for (entry, output) in batch.iter().zip(outputs) {
                let result = output.into_top().ok_or(RepairError::EmptyCandidates {
                    input_index: entry.input_index,
                })?;
                let routing = |reason: &str| RepairError::Routing {
                    input_index: entry.input_index,
                    window_position: entry.window_position,
                    reason: reason.to_string(),
                };

                let slot = arena
                    .get_mut(entry.input_index)
                    .and_then(|slots| slots.get_mut(entry.window_position))
                    .ok_or_else(|| routing("no such window"))?;
                if slot.is_some() {
                    return Err(routing("window result delivered twice"));
                }
                *slot = Some(result);
            }

            debug!(
                batch = batch_index,
                sequences = batch.len(),
                chars,
                "batch finished"
            );
            if let Some(progress) = progress {
                progress.batch_finished(chars);
            }
        }

        if let Some(progress) = progress {
            progress.finish();
        }
        Ok(arena)
    }

    fn merge_all(
        &self,
        inputs: &[String],
        schedule: &Schedule,
        arena: Vec<Slots>,
    ) -> Result<Vec<InferenceResult>> {
        let merger = self
            .adapter
            .vocabulary()
            .map_or_else(ResultMerger::new, ResultMerger::with_vocabulary);

        arena
            .into_iter()
            .zip(schedule.plans())
            .enumerate()
            .map(|(input_index, (slots, plan))| {
                let results = slots
                    .into_iter()
                    .enumerate()
                    .map(|(window_position, slot)| {
                        slot.ok_or_else(|| RepairError::Routing {
                            input_index,
                            window_position,
                            reason: "no result delivered".to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                merger
                    .merge(plan, results, &inputs[input_index])
                    .map_err(|source| RepairError::Merge {
                        input_index,
                        source,
                    })
            })
            .collect()
    }
}

/// Iterator returned by [`TokenizationRepairer::repair_iter`]
///
/// A failed chunk yields its error once; the iterator then ends without
/// pulling further items.
pub struct RepairIter<'r, A, I> {
    repairer: &'r TokenizationRepairer<A>,
    texts: I,
    buffer: VecDeque<String>,
    failed: bool,
}

impl<A, I> Iterator for RepairIter<'_, A, I>
where
    A: InferenceAdapter,
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.buffer.is_empty() {
            let chunk: Vec<I::Item> = self
                .texts
                .by_ref()
                .take(self.repairer.config.batch_size)
                .collect();
            if chunk.is_empty() {
                return None;
            }

            match self.repairer.repair_batch(chunk.as_slice()) {
                Ok(repaired) => self.buffer.extend(repaired),
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Builder for [`TokenizationRepairer`]
pub struct TokenizationRepairerBuilder<A> {
    adapter: A,
    config_builder: RepairConfigBuilder,
    progress: Option<Box<dyn ProgressObserver>>,
}

impl<A: InferenceAdapter> TokenizationRepairerBuilder<A> {
    /// Create a new builder
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            config_builder: RepairConfigBuilder::new(),
            progress: None,
        }
    }

    /// Set the number of sequences per model call
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config_builder = self.config_builder.batch_size(size);
        self
    }

    /// Sort windows by length before batching
    pub fn sort_by_length(mut self, sort: bool) -> Self {
        self.config_builder = self.config_builder.sort_by_length(sort);
        self
    }

    /// Enable progress notifications
    pub fn show_progress(mut self, show: bool) -> Self {
        self.config_builder = self.config_builder.show_progress(show);
        self
    }

    /// Set the characters per model sequence, markers excluded
    pub fn max_length(mut self, length: usize) -> Self {
        self.config_builder = self.config_builder.max_length(length);
        self
    }

    /// Set the model capacity including the begin/end markers
    pub fn model_capacity(mut self, capacity: usize) -> Self {
        self.config_builder = self.config_builder.model_capacity(capacity);
        self
    }

    /// Override the window core size
    pub fn window_size(mut self, size: usize) -> Self {
        self.config_builder = self.config_builder.window_size(size);
        self
    }

    /// Set the task options passed with every batch
    pub fn task_options(mut self, options: TaskOptions) -> Self {
        self.config_builder = self.config_builder.task_options(options);
        self
    }

    /// Attach a progress observer
    pub fn progress<P: ProgressObserver + 'static>(mut self, observer: P) -> Self {
        self.progress = Some(Box::new(observer));
        self
    }

    /// Build the repairer
    pub fn build(self) -> Result<TokenizationRepairer<A>> {
        let config = self.config_builder.build()?;
        let mut repairer = TokenizationRepairer::new(self.adapter, config)?;
        repairer.progress = self.progress;
        Ok(repairer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapter::{PassthroughAdapter, Task},
        error::{AdapterError, ConfigError},
        inference::InferenceOutput,
    };
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_passthrough_normalises_whitespace() {
        let repairer = TokenizationRepairer::new(PassthroughAdapter, RepairConfig::default()).unwrap();

        assert_eq!(repairer.repair_text("  the   quick\tfox ").unwrap(), "the quick fox");
    }

    #[test]
    fn test_repair_preserves_shape() {
        let repairer = TokenizationRepairer::builder(PassthroughAdapter)
            .build()
            .unwrap();

        assert_eq!(
            repairer.repair(RepairInput::from("a  b")).unwrap(),
            RepairOutput::Text("a b".into())
        );
        assert_eq!(
            repairer.repair(RepairInput::from(vec!["x", " y "])).unwrap(),
            RepairOutput::Batch(vec!["x".into(), "y".into()])
        );
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let repairer = TokenizationRepairer::builder(PassthroughAdapter)
            .build()
            .unwrap();

        let err = repairer.repair(RepairInput::Batch(Vec::new())).unwrap_err();
        assert!(matches!(err, RepairError::InvalidInput { .. }));
    }

    #[test]
    fn test_task_mismatch_is_rejected() {
        let result = TokenizationRepairer::builder(PassthroughAdapter)
            .task_options(TaskOptions::for_task(Task::Generation))
            .build();

        assert!(matches!(
            result,
            Err(RepairError::Config(ConfigError::TaskMismatch { .. }))
        ));
    }

    struct ShortAdapter;

    impl InferenceAdapter for ShortAdapter {
        fn task(&self) -> Task {
            Task::Classification
        }

        fn infer(
            &self,
            request: &InferenceRequest<'_>,
        ) -> std::result::Result<Vec<InferenceOutput>, AdapterError> {
            let mut outputs = PassthroughAdapter.infer(request)?;
            outputs.pop();
            Ok(outputs)
        }
    }

    #[test]
    fn test_missing_output_breaks_contract() {
        let repairer = TokenizationRepairer::builder(ShortAdapter)
            .batch_size(4)
            .build()
            .unwrap();

        let err = repairer.repair_batch(&["a", "b"]).unwrap_err();
        assert!(matches!(
            err,
            RepairError::AdapterContract {
                expected: 2,
                actual: 1
            }
        ));
    }

    struct FailingAdapter;

    impl InferenceAdapter for FailingAdapter {
        fn task(&self) -> Task {
            Task::Classification
        }

        fn infer(
            &self,
            _request: &InferenceRequest<'_>,
        ) -> std::result::Result<Vec<InferenceOutput>, AdapterError> {
            Err("model crashed".into())
        }
    }

    #[test]
    fn test_adapter_error_is_propagated() {
        let repairer = TokenizationRepairer::builder(FailingAdapter).build().unwrap();

        match repairer.repair_text("abc").unwrap_err() {
            RepairError::Adapter { source } => assert_eq!(source.to_string(), "model crashed"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    struct EmptyBeamAdapter;

    impl InferenceAdapter for EmptyBeamAdapter {
        fn task(&self) -> Task {
            Task::Classification
        }

        fn infer(
            &self,
            request: &InferenceRequest<'_>,
        ) -> std::result::Result<Vec<InferenceOutput>, AdapterError> {
            Ok(vec![InferenceOutput::Ranked(Vec::new()); request.len()])
        }
    }

    #[test]
    fn test_empty_candidate_list() {
        let repairer = TokenizationRepairer::builder(EmptyBeamAdapter).build().unwrap();

        assert!(matches!(
            repairer.repair_text("abc"),
            Err(RepairError::EmptyCandidates { input_index: 0 })
        ));
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl ProgressObserver for Recorder {
        fn start(&self, total_chars: usize) {
            self.0.borrow_mut().push(format!("start {total_chars}"));
        }

        fn batch_finished(&self, chars: usize) {
            self.0.borrow_mut().push(format!("batch {chars}"));
        }

        fn finish(&self) {
            self.0.borrow_mut().push("finish".to_string());
        }
    }

    #[test]
    fn test_progress_observer_notified_when_enabled() {
        let recorder = Recorder::default();
        let repairer = TokenizationRepairer::builder(PassthroughAdapter)
            .batch_size(2)
            .sort_by_length(false)
            .show_progress(true)
            .progress(recorder.clone())
            .build()
            .unwrap();

        repairer.repair_batch(&["ab", "c", "def"]).unwrap();
        assert_eq!(
            *recorder.0.borrow(),
            vec!["start 6", "batch 3", "batch 3", "finish"]
        );
    }

    #[test]
    fn test_progress_observer_silent_by_default() {
        let recorder = Recorder::default();
        let repairer = TokenizationRepairer::builder(PassthroughAdapter)
            .progress(recorder.clone())
            .build()
            .unwrap();

        repairer.repair_text("abc").unwrap();
        assert!(recorder.0.borrow().is_empty());
    }

    #[test]
    fn test_repair_iter_batches_lazily() {
        let repairer = TokenizationRepairer::builder(PassthroughAdapter)
            .batch_size(2)
            .build()
            .unwrap();

        let repaired: Vec<String> = repairer
            .repair_iter(vec![" a ", "b  c", "d", "e"])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(repaired, vec!["a", "b c", "d", "e"]);
    }

    #[test]
    fn test_repair_iter_stops_after_first_error() {
        let repairer = TokenizationRepairer::builder(FailingAdapter)
            .batch_size(2)
            .build()
            .unwrap();
        let pulled = std::cell::Cell::new(0);
        let texts = (0..10).map(|i| {
            pulled.set(pulled.get() + 1);
            format!("text {i}")
        });

        let mut iter = repairer.repair_iter(texts);
        assert!(matches!(iter.next(), Some(Err(RepairError::Adapter { .. }))));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn test_repair_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, "  hello   world \n\nsecond  line").unwrap();

        let repairer = TokenizationRepairer::builder(PassthroughAdapter).build().unwrap();
        let lines = repairer.repair_file(&input, Some(&output)).unwrap();

        assert_eq!(lines, vec!["hello world", "", "second line"]);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "hello world\n\nsecond line\n"
        );
    }

    #[test]
    fn test_repair_raw_returns_merged_results() {
        let repairer = TokenizationRepairer::builder(PassthroughAdapter)
            .max_length(8)
            .window_size(6)
            .build()
            .unwrap();

        let results = repairer.repair_raw(&["x".repeat(20)]).unwrap();
        match &results[0] {
            InferenceResult::Classification(result) => assert_eq!(result.len(), 22),
            other => panic!("unexpected {}", other.kind()),
        }
        assert!(repairer.vocabulary().is_none());
    }
}
