pub mod camera;
pub mod host;

use host::Host;

/// Lifecycle hooks the host calls on every plugin. Only `setup` is mandatory.
pub trait Plugin {
    /// Register palettes and primitives with the host.
    fn setup(&mut self, host: &mut dyn Host);

    /// Start button
    fn start(&mut self) {}

    /// Stop button
    fn stop(&mut self) {}

    fn goto_background(&mut self) {}

    fn return_to_foreground(&mut self) {}

    /// Quit button
    fn quit(&mut self) {}
}
