//! Single-pass execution of one module: preprocess, run, postprocess.

use crate::context::Context;
use crate::error::{FrameworkError, Result};
use crate::event::FrameworkEvent;
use crate::module::instance::Module;
use crate::module::process::{Preprocess, ProcessorChain};
use crate::module::value::Value;
use std::fmt;

/// Lifecycle of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Created,
    Preprocessed,
    Ran,
    Postprocessed,
    Done,
    /// A preprocessor cancelled the run.
    Canceled,
    Error,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Canceled | RunState::Error)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Created => "created",
            RunState::Preprocessed => "preprocessed",
            RunState::Ran => "ran",
            RunState::Postprocessed => "postprocessed",
            RunState::Done => "done",
            RunState::Canceled => "canceled",
            RunState::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Drives one module through the processor chain exactly once.
pub struct ModuleRunner<'a> {
    module: Box<dyn Module>,
    ctx: &'a Context,
    chain: &'a ProcessorChain,
    state: RunState,
    error: Option<FrameworkError>,
    cancel_reason: Option<String>,
}

impl<'a> ModuleRunner<'a> {
    pub fn new(module: Box<dyn Module>, ctx: &'a Context, chain: &'a ProcessorChain) -> Self {
        Self {
            module,
            ctx,
            chain,
            state: RunState::Created,
            error: None,
            cancel_reason: None,
        }
    }

    /// Execute all stages. Calling again after the first pass is a no-op.
    pub fn run(&mut self) -> RunState {
        if self.state != RunState::Created {
            return self.state;
        }
        let (ctx, chain) = (self.ctx, self.chain);
        let title = self.module.info().title();
        tracing::debug!("Running module '{}'", title);
        ctx.publish(FrameworkEvent::ModuleStarted {
            title: title.clone(),
        });

        for pre in chain.preprocessors() {
            match pre.process(self.module.as_mut(), ctx) {
                Ok(Preprocess::Continue) => {}
                Ok(Preprocess::Cancel(reason)) => {
                    tracing::info!("'{}' canceled by {}: {}", title, pre.name(), reason);
                    ctx.publish(FrameworkEvent::ModuleCanceled {
                        title,
                        reason: reason.clone(),
                    });
                    self.cancel_reason = Some(reason);
                    self.state = RunState::Canceled;
                    return self.state;
                }
                Err(e) => {
                    tracing::debug!("Preprocessor '{}' failed", pre.name());
                    return self.fail(title, e);
                }
            }
        }
        self.advance(RunState::Preprocessed, FrameworkEvent::ModulePreprocessed {
            title: title.clone(),
        });

        if let Err(source) = self.module.run(ctx) {
            let e = FrameworkError::Execution {
                title: title.clone(),
                source,
            };
            return self.fail(title, e);
        }
        self.advance(RunState::Ran, FrameworkEvent::ModuleExecuted {
            title: title.clone(),
        });

        for post in chain.postprocessors() {
            if let Err(e) = post.process(self.module.as_mut(), ctx) {
                ctx.log().error_with(
                    &format!("Postprocessor '{}' failed for '{}'", post.name(), title),
                    &anyhow::Error::new(e),
                );
            }
        }
        self.advance(RunState::Postprocessed, FrameworkEvent::ModulePostprocessed {
            title: title.clone(),
        });

        self.advance(RunState::Done, FrameworkEvent::ModuleFinished { title });
        self.state
    }

    fn advance(&mut self, state: RunState, event: FrameworkEvent) {
        self.state = state;
        self.ctx.publish(event);
    }

    fn fail(&mut self, title: String, error: FrameworkError) -> RunState {
        tracing::error!("{}", error);
        self.ctx.publish(FrameworkEvent::ModuleFailed {
            title,
            message: error.to_string(),
        });
        self.error = Some(error);
        self.state = RunState::Error;
        self.state
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn error(&self) -> Option<&FrameworkError> {
        self.error.as_ref()
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn module(&self) -> &dyn Module {
        self.module.as_ref()
    }

    /// Consume the runner. A failed run yields its error.
    pub fn finish(self) -> Result<Execution> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(Execution {
                module: self.module,
                state: self.state,
                cancel_reason: self.cancel_reason,
            }),
        }
    }
}

/// Result of a completed or cancelled execution.
pub struct Execution {
    pub module: Box<dyn Module>,
    pub state: RunState,
    pub cancel_reason: Option<String>,
}

impl Execution {
    pub fn is_canceled(&self) -> bool {
        self.state == RunState::Canceled
    }

    pub fn output(&self, name: &str) -> Result<Value> {
        self.module.value(name)
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("module", &self.module.info().title())
            .field("state", &self.state)
            .field("cancel_reason", &self.cancel_reason)
            .finish()
    }
}
