//! Ordered composition of named stages.
//!
//! A [`Sequential`] applies its stages in insertion order, threading the
//! output of each stage into the next. Stage names are unique and double as
//! the `VarBuilder` prefixes their parameters were created under, so
//! `stage_names()` lines up with checkpoint keys such as `conv.weight`.

use std::fmt;

use candle_core::{Error, Result, Tensor};
use candle_nn::ModuleT;

use crate::{activations::Relu, conv::Conv2d, norm::BatchNorm2d};

/// Identifies what a stage computes, for introspection when wiring stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Conv2d,
    BatchNorm2d,
    Relu,
}

/// A single step of a [`Sequential`] pipeline.
pub trait Stage: ModuleT + Send + Sync + fmt::Debug {
    fn kind(&self) -> StageKind;
}

impl Stage for Conv2d {
    fn kind(&self) -> StageKind {
        StageKind::Conv2d
    }
}

impl Stage for BatchNorm2d {
    fn kind(&self) -> StageKind {
        StageKind::BatchNorm2d
    }
}

impl Stage for Relu {
    fn kind(&self) -> StageKind {
        StageKind::Relu
    }
}

#[derive(Debug)]
struct NamedStage {
    name: String,
    stage: Box<dyn Stage>,
}

/// Stages applied one after another.
#[derive(Debug, Default)]
pub struct Sequential {
    stages: Vec<NamedStage>,
}

impl Sequential {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `stage` under `name`. Names must be unique within the pipeline.
    pub fn push(&mut self, name: impl Into<String>, stage: impl Stage + 'static) -> Result<()> {
        let name = name.into();
        if self.stages.iter().any(|existing| existing.name == name) {
            return Err(Error::Msg(format!("duplicate stage name `{name}`")));
        }
        self.stages.push(NamedStage {
            name,
            stage: Box::new(stage),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.stage.kind()).collect()
    }

    /// Looks a stage up by name.
    pub fn get(&self, name: &str) -> Option<&dyn Stage> {
        self.stages
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.stage.as_ref())
    }
}

impl ModuleT for Sequential {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let mut hidden = xs.clone();
        for named in &self.stages {
            hidden = named.stage.forward_t(&hidden, train)?;
        }
        Ok(hidden)
    }
}
