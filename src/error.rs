use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("job with id {0} does not exist")]
    JobNotFound(u64),

    #[error("failed to launch job {id}: {source}")]
    Launch { id: u64, source: std::io::Error },

    #[error("failed to kill job {id}: {source}")]
    Kill { id: u64, source: std::io::Error },
}

pub type Result<T> = std::result::Result<T, JobError>;
