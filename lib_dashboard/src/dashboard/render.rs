//! # Renderer Capability
//!
//! The engine never reaches into presentation primitives. It hands finished
//! view-models to a [`Renderer`], which is free to draw them on a canvas, a
//! terminal, or nowhere at all.

use std::sync::{Arc, Mutex};

use crate::dashboard::views::{ViewModel, WidgetId};

/// An opaque sink that draws one widget at a time.
pub trait Renderer: Send {
    /// Draws `view` into `widget`, replacing whatever was there.
    fn draw(&mut self, widget: WidgetId, view: &ViewModel);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn draw(&mut self, widget: WidgetId, view: &ViewModel) {
        (**self).draw(widget, view)
    }
}

/// Lets a renderer be inspected while the controller owning it runs in
/// another task.
impl<R: Renderer> Renderer for Arc<Mutex<R>> {
    fn draw(&mut self, widget: WidgetId, view: &ViewModel) {
        match self.lock() {
            Ok(mut inner) => inner.draw(widget, view),
            Err(_) => log::error!("Renderer lock poisoned; dropping draw for {:?}", widget),
        }
    }
}

/// Keeps every draw call in order. Used by tests and headless tooling.
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    pub draws: Vec<(WidgetId, ViewModel)>,
}

impl RecordingRenderer {
    /// Widgets drawn so far, in call order.
    pub fn widgets(&self) -> Vec<WidgetId> {
        self.draws.iter().map(|(w, _)| *w).collect()
    }

    /// Most recent view drawn into `widget`.
    pub fn last(&self, widget: WidgetId) -> Option<&ViewModel> {
        self.draws.iter().rev().find(|(w, _)| *w == widget).map(|(_, v)| v)
    }

    /// Number of draws into `widget`.
    pub fn count(&self, widget: WidgetId) -> usize {
        self.draws.iter().filter(|(w, _)| *w == widget).count()
    }

    pub fn clear(&mut self) {
        self.draws.clear();
    }
}

impl Renderer for RecordingRenderer {
    fn draw(&mut self, widget: WidgetId, view: &ViewModel) {
        self.draws.push((widget, view.clone()));
    }
}
