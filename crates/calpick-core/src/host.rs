//! Capabilities the picker needs from
//! whatever document it lives in.
//!
//! A browser binding maps these onto
//! the DOM; [`HeadlessHost`] keeps
//! everything in memory for tests and
//! the CLI.

use std::collections::{
  BTreeMap,
  BTreeSet
};

/// Who caused a change notification on
/// the bound field.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum ChangeOrigin {
  Picker,
  User
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
)]
pub enum Listener {
  SurfacePointer,
  SurfaceTouch,
  SurfaceChange,
  DocumentKeydown,
  DocumentClick,
  FieldChange,
  TriggerPointer,
  TriggerFocus,
  TriggerBlur
}

/// Where the calendar surface is
/// attached.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Mount {
  Container,
  DocumentBody,
  AfterField
}

/// Page coordinates.
#[derive(
  Debug, Clone, Copy, PartialEq, Default,
)]
pub struct Rect {
  pub left:   f64,
  pub top:    f64,
  pub width:  f64,
  pub height: f64
}

impl Rect {
  #[must_use]
  pub fn bottom(&self) -> f64 {
    self.top + self.height
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Default,
)]
pub struct Size {
  pub width:  f64,
  pub height: f64
}

#[derive(
  Debug, Clone, Copy, PartialEq, Default,
)]
pub struct Viewport {
  pub width:    f64,
  pub height:   f64,
  pub scroll_y: f64
}

#[derive(
  Debug, Clone, Copy, PartialEq, Default,
)]
pub enum InlinePosition {
  #[default]
  Static,
  Absolute {
    left: f64,
    top:  f64
  }
}

pub trait Host {
  fn has_field(&self) -> bool;

  /// A trigger element distinct from
  /// the field opens the picker.
  fn has_separate_trigger(&self) -> bool;

  fn field_value(&self) -> String;

  fn set_field_value(
    &mut self,
    value: &str
  );

  fn dispatch_field_change(
    &mut self,
    origin: ChangeOrigin
  );

  fn set_field_attribute(
    &mut self,
    name: &str,
    value: &str
  );

  fn field_is_read_only(&self) -> bool;

  fn field_is_hidden(&self) -> bool;

  fn focus_field(&mut self);

  fn blur_field(&mut self);

  fn focus_trigger(&mut self);

  fn set_markup(&mut self, html: String);

  fn add_class(&mut self, class: &str);

  fn remove_class(&mut self, class: &str);

  fn set_inline_position(
    &mut self,
    position: InlinePosition
  );

  fn surface_size(&self) -> Size;

  fn anchor_rect(&self) -> Rect;

  fn viewport(&self) -> Viewport;

  fn listen(&mut self, listener: Listener);

  fn unlisten(
    &mut self,
    listener: Listener
  );

  fn mount(&mut self, mount: Mount);

  fn unmount(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct FieldState {
  pub value:      String,
  pub read_only:  bool,
  pub hidden:     bool,
  pub focused:    bool,
  pub attributes: BTreeMap<String, String>
}

/// In-memory host that records every
/// call the picker makes.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
  pub field:            Option<FieldState>,
  pub separate_trigger: bool,
  pub changes:          Vec<(String, ChangeOrigin)>,
  pub markup:           String,
  pub renders:          usize,
  pub classes:          BTreeSet<String>,
  pub inline:           InlinePosition,
  pub surface:          Size,
  pub anchor:           Rect,
  pub viewport:         Viewport,
  pub listeners:        BTreeSet<Listener>,
  pub mounted:          Option<Mount>,
  pub trigger_focuses:  usize
}

impl Default for HeadlessHost {
  fn default() -> Self {
    Self {
      field:            None,
      separate_trigger: false,
      changes:          Vec::new(),
      markup:           String::new(),
      renders:          0,
      classes:          BTreeSet::new(),
      inline:           InlinePosition::Static,
      surface:          Size {
        width:  250.0,
        height: 240.0
      },
      anchor:           Rect {
        left:   20.0,
        top:    20.0,
        width:  160.0,
        height: 24.0
      },
      viewport:         Viewport {
        width:    1024.0,
        height:   768.0,
        scroll_y: 0.0
      },
      listeners:        BTreeSet::new(),
      mounted:          None,
      trigger_focuses:  0
    }
  }
}

impl HeadlessHost {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn with_field(
    mut self,
    value: &str
  ) -> Self {
    self.field = Some(FieldState {
      value: value.to_string(),
      ..FieldState::default()
    });
    self
  }

  #[must_use]
  pub fn with_trigger(mut self) -> Self {
    self.separate_trigger = true;
    self
  }

  #[must_use]
  pub fn has_class(
    &self,
    class: &str
  ) -> bool {
    self.classes.contains(class)
  }

  /// Simulates the user typing into the
  /// field; the caller still delivers
  /// the change event.
  pub fn type_into_field(
    &mut self,
    value: &str
  ) {
    if let Some(field) = self.field.as_mut()
    {
      field.value = value.to_string();
    }
  }
}

impl Host for HeadlessHost {
  fn has_field(&self) -> bool {
    self.field.is_some()
  }

  fn has_separate_trigger(&self) -> bool {
    self.separate_trigger
  }

  fn field_value(&self) -> String {
    self
      .field
      .as_ref()
      .map(|field| field.value.clone())
      .unwrap_or_default()
  }

  fn set_field_value(
    &mut self,
    value: &str
  ) {
    if let Some(field) = self.field.as_mut()
    {
      field.value = value.to_string();
    }
  }

  fn dispatch_field_change(
    &mut self,
    origin: ChangeOrigin
  ) {
    let value = self.field_value();
    self.changes.push((value, origin));
  }

  fn set_field_attribute(
    &mut self,
    name: &str,
    value: &str
  ) {
    if let Some(field) = self.field.as_mut()
    {
      field.attributes.insert(
        name.to_string(),
        value.to_string()
      );
    }
  }

  fn field_is_read_only(&self) -> bool {
    self
      .field
      .as_ref()
      .is_some_and(|field| field.read_only)
  }

  fn field_is_hidden(&self) -> bool {
    self
      .field
      .as_ref()
      .is_some_and(|field| field.hidden)
  }

  fn focus_field(&mut self) {
    if let Some(field) = self.field.as_mut()
    {
      field.focused = true;
    }
  }

  fn blur_field(&mut self) {
    if let Some(field) = self.field.as_mut()
    {
      field.focused = false;
    }
  }

  fn focus_trigger(&mut self) {
    self.trigger_focuses += 1;
  }

  fn set_markup(&mut self, html: String) {
    self.markup = html;
    self.renders += 1;
  }

  fn add_class(&mut self, class: &str) {
    self.classes.insert(class.to_string());
  }

  fn remove_class(&mut self, class: &str) {
    self.classes.remove(class);
  }

  fn set_inline_position(
    &mut self,
    position: InlinePosition
  ) {
    self.inline = position;
  }

  fn surface_size(&self) -> Size {
    self.surface
  }

  fn anchor_rect(&self) -> Rect {
    self.anchor
  }

  fn viewport(&self) -> Viewport {
    self.viewport
  }

  fn listen(&mut self, listener: Listener) {
    self.listeners.insert(listener);
  }

  fn unlisten(
    &mut self,
    listener: Listener
  ) {
    self.listeners.remove(&listener);
  }

  fn mount(&mut self, mount: Mount) {
    self.mounted = Some(mount);
  }

  fn unmount(&mut self) {
    self.mounted = None;
  }
}
