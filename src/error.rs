use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("could not start the async runtime")]
    Runtime,
    #[display("could not open the library root")]
    Storage,
    #[display("could not set up the API client")]
    Client,
    #[display("could not list identifier directories")]
    Enumerate,
    #[display("could not build the rename plan")]
    Plan,
    #[display("could not read confirmation")]
    Prompt,
}
