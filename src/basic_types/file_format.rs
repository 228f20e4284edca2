#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    CnfDimacsPLine,
    WcnfDimacsPLine,
}
