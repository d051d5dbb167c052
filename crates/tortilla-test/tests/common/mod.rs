//! Shared fixtures for the end-to-end tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tortilla::prelude::*;

/// Ordered record of what ran.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

/// How a [`Recorder`] misbehaves.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    ShortCircuit,
    FailBefore,
    FailAfter,
}

/// Middleware that logs `<label>-before` and `<label>-after`.
pub struct Recorder {
    label: String,
    log: Log,
    fault: Fault,
}

impl Recorder {
    pub fn new(label: &str, log: &Log) -> Self {
        Self::with_fault(label, log, Fault::None)
    }

    pub fn with_fault(label: &str, log: &Log, fault: Fault) -> Self {
        Self {
            label: label.to_string(),
            log: log.clone(),
            fault,
        }
    }
}

impl Callable for Recorder {
    fn name(&self) -> &str {
        &self.label
    }
}

impl Middleware for Recorder {
    fn before_dispatch<'a>(
        &'a self,
        _req: &'a Request,
    ) -> BoxFuture<'a, DispatchResult<Option<Response>>> {
        Box::pin(async move {
            self.log.push(format!("{}-before", self.label));
            match self.fault {
                Fault::FailBefore => Err(DispatchError::from(Teapot)),
                Fault::ShortCircuit => {
                    let mut res = Response::new();
                    res.set_text(format!("short-circuited by {}", self.label));
                    Ok(Some(res))
                }
                _ => Ok(None),
            }
        })
    }

    fn after_dispatch<'a>(
        &'a self,
        _req: &'a Request,
        res: Response,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            self.log.push(format!("{}-after", self.label));
            if self.fault == Fault::FailAfter {
                return Err(DispatchError::from(Teapot));
            }
            Ok(res)
        })
    }
}

/// An application error with no registered handler by default.
#[derive(Debug, thiserror::Error)]
#[error("the kettle boiled over")]
pub struct Teapot;

impl ErrorClass for Teapot {}

/// A hook that logs `label`.
pub fn recording_hook(label: &str, log: &Log) -> impl Hook {
    let log = log.clone();
    let entry = label.to_string();
    hook(label, move |_req, res: Response, _params, _args| {
        let log = log.clone();
        let entry = entry.clone();
        async move {
            log.push(entry);
            Ok(res)
        }
    })
}

/// A view that logs `label` and answers with it.
pub fn recording_view(label: &str, log: &Log) -> impl tortilla::ViewHandler {
    let log = log.clone();
    let entry = label.to_string();
    view(label, move |_req, mut res: Response| {
        let log = log.clone();
        let entry = entry.clone();
        async move {
            log.push(entry.clone());
            res.set_text(entry);
            Ok(res)
        }
    })
}

/// A view that always raises `Teapot`.
pub fn failing_view(label: &str, log: &Log) -> impl tortilla::ViewHandler {
    let log = log.clone();
    let entry = label.to_string();
    view(label, move |_req, _res: Response| {
        let log = log.clone();
        let entry = entry.clone();
        async move {
            log.push(entry);
            Err::<Response, _>(DispatchError::from(Teapot))
        }
    })
}
