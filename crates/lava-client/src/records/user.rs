//! Per-user job accounting.

use serde::Serialize;

use crate::records::host::counter;
use crate::xdr::{MarshalResult, XdrDecode, XdrDecoder, XdrEncode, XdrEncoder};

/// The master's "no limit" value for integer limits.
pub const INFINIT_INT: i32 = i32::MAX;

/// Job counts and limits for one user (or user group).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInfoEnt {
    pub user: String,
    /// Per-user process-job limit.
    pub proc_job_limit: f32,
    pub max_jobs: i32,
    pub num_start_jobs: i32,
    pub num_jobs: i32,
    pub num_pend: i32,
    pub num_run: i32,
    pub num_ssusp: i32,
    pub num_ususp: i32,
    pub num_reserve: i32,
}

impl UserInfoEnt {
    /// `None` when the user has no job limit.
    pub fn job_limit(&self) -> Option<i32> {
        (self.max_jobs != INFINIT_INT && self.max_jobs >= 0).then_some(self.max_jobs)
    }
}

impl XdrEncode for UserInfoEnt {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_str(&self.user);
        enc.put_f32(self.proc_job_limit);
        enc.put_i32(self.max_jobs);
        enc.put_i32(self.num_start_jobs);
        enc.put_i32(self.num_jobs);
        enc.put_i32(self.num_pend);
        enc.put_i32(self.num_run);
        enc.put_i32(self.num_ssusp);
        enc.put_i32(self.num_ususp);
        enc.put_i32(self.num_reserve);
    }
}

impl XdrDecode for UserInfoEnt {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        Ok(Self {
            user: dec.name("userInfoEnt.user")?,
            proc_job_limit: dec.factor("userInfoEnt.procJobLimit")?,
            max_jobs: counter(dec, "userInfoEnt.maxJobs")?,
            num_start_jobs: counter(dec, "userInfoEnt.numStartJobs")?,
            num_jobs: counter(dec, "userInfoEnt.numJobs")?,
            num_pend: counter(dec, "userInfoEnt.numPEND")?,
            num_run: counter(dec, "userInfoEnt.numRUN")?,
            num_ssusp: counter(dec, "userInfoEnt.numSSUSP")?,
            num_ususp: counter(dec, "userInfoEnt.numUSUSP")?,
            num_reserve: counter(dec, "userInfoEnt.numRESERVE")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdr::{from_bytes, to_bytes};

    #[test]
    fn test_user_decode() {
        let user = UserInfoEnt {
            user: "alice".into(),
            proc_job_limit: 2.5,
            max_jobs: INFINIT_INT,
            num_start_jobs: 1,
            num_jobs: 3,
            num_pend: 2,
            num_run: 1,
            num_ssusp: 0,
            num_ususp: 0,
            num_reserve: 0,
        };
        let back: UserInfoEnt = from_bytes(&to_bytes(&user)).unwrap();
        assert_eq!(back.num_jobs, 3);
        assert_eq!(back.proc_job_limit, 2.5);
        assert_eq!(back.job_limit(), None);
    }

    #[test]
    fn test_negative_counts_rejected() {
        let user = UserInfoEnt {
            user: "bob".into(),
            proc_job_limit: 1.0,
            max_jobs: 10,
            num_start_jobs: 0,
            num_jobs: 0,
            num_pend: -1,
            num_run: 0,
            num_ssusp: 0,
            num_ususp: 0,
            num_reserve: 0,
        };
        assert!(from_bytes::<UserInfoEnt>(&to_bytes(&user)).is_err());
    }
}
