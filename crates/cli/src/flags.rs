use clap::ValueEnum;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub(crate) const fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Toggle::On => "enabled",
            Toggle::Off => "disabled",
        }
    }
}
