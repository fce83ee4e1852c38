#[derive(Debug, Clone)]
pub enum Message {
    PickInput,
    PickOutput,
    PickColorModel,
    PickGrayModel,
    Start,
    Cancel,
    /// Periodic poll of the worker's progress channel.
    Tick,
}
