/// Pull resistor wiring for a manual input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
    None,
}

/// Pin-number-indexed hardware access.
///
/// The controller addresses outputs and inputs by the pin numbers carried in
/// its switch map, so the driver is one object over the whole bank rather
/// than one object per pin. `true` is the electrically high level; relay
/// polarity mapping happens above this trait.
pub trait PinDriver {
    type Error: core::fmt::Debug;

    fn configure_output(&mut self, pin: u8) -> Result<(), Self::Error>;

    fn configure_input(&mut self, pin: u8, pull: Pull) -> Result<(), Self::Error>;

    fn write(&mut self, pin: u8, level: bool) -> Result<(), Self::Error>;

    fn read(&mut self, pin: u8) -> Result<bool, Self::Error>;
}
