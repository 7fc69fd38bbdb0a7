//! Client sessions against the in-process simulated master.

use std::time::Duration;

use chrono::{TimeZone, Utc};

use lava_adapter_sim::{Faults, SimMaster};
use lava_client::reasons::job_pending_reasons;
use lava_client::records::{XFile, rlimit};
use lava_client::{
    ClientConfig, CursorState, ErrorKind, JobFilter, JobState, LavaError, LoadIndexLog, Session,
    Submit, SubmitField,
};

async fn session() -> Session<SimMaster> {
    Session::init(SimMaster::seeded(), ClientConfig::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_cluster_queries() {
    let mut session = session().await;
    assert_eq!(session.cluster_name().await.unwrap(), "lava");
    assert_eq!(session.master_name().await.unwrap(), "master01");

    let info = session.static_info().await.unwrap();
    assert_eq!(info.host_models, vec!["IntelXeon", "AMDEpyc"]);
    assert_eq!(info.model_factor("AMDEpyc"), Some(2.0));

    assert_eq!(session.host_type("node01").await.unwrap(), "linux");
    assert_eq!(session.host_model("node01").await.unwrap(), "AMDEpyc");
    assert_eq!(session.host_factor("master01").await.unwrap(), 1.0);

    let err = session.host_factor("nosuch").await.unwrap_err();
    assert!(matches!(err, LavaError::NotFound(_)));
    assert_eq!(session.last_result(), ErrorKind::NotFound);

    assert_eq!(session.queue_info(&[]).await.unwrap().len(), 5);
    let hosts = session.host_runtime_info(&["node01".to_string()]).await.unwrap();
    assert_eq!(hosts[0].num_run, 1);
    let users = session.user_info(&[]).await.unwrap();
    assert_eq!(users.len(), 3);
    assert_eq!(session.last_result(), ErrorKind::NoError);
}

#[tokio::test]
async fn test_reading_the_count_exhausts_the_cursor() {
    let mut session = session().await;
    let count = session.open_jobs(&JobFilter::all()).await.unwrap();
    assert_eq!(count, 3);

    for _ in 0..count {
        assert!(session.read_job().await.unwrap().is_some());
        assert_eq!(session.last_result(), ErrorKind::NoError);
    }
    assert!(session.read_job().await.unwrap().is_none());
    assert_eq!(session.last_result(), ErrorKind::Eof);

    session.close_jobs().await.unwrap();
    session.close_jobs().await.unwrap();
    let err = session.read_job().await.unwrap_err();
    assert!(matches!(err, LavaError::BadRequest(_)));
    assert_eq!(session.last_result(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_hostname_submission_gets_job_id() {
    let mut session = session().await;
    let request = Submit::new("hostname").with_processors(1, 1);
    let reply = session.submit(&request).await.unwrap();
    assert!(reply.job_id.is_some_and(|id| id >= 0));
    assert_eq!(reply.queue, "normal");
    assert_eq!(session.last_result(), ErrorKind::NoError);
}

#[tokio::test]
async fn test_nonexistent_job_id() {
    let mut session = session().await;
    assert_eq!(session.open_jobs(&JobFilter::by_id(999_999)).await.unwrap(), 0);
    assert_eq!(session.last_result(), ErrorKind::NotFound);
    assert!(session.read_job().await.unwrap().is_none());
    assert_eq!(session.cursor_state().remaining(), 0);
    session.close_jobs().await.unwrap();
}

#[tokio::test]
async fn test_submitted_fields_come_back_through_the_cursor() {
    let mut session = session().await;
    let begin = Utc.with_ymd_and_hms(2031, 3, 1, 8, 0, 0).unwrap();
    let term = Utc.with_ymd_and_hms(2031, 3, 2, 8, 0, 0).unwrap();
    let request = Submit::new("./solver --input mesh.dat")
        .with_job_name("solver")
        .with_queue("priority")
        .with_hosts(["node01", "node02"])
        .with_processors(2, 4)
        .with_in_file("/dev/null")
        .with_out_file("solver.%J.out")
        .with_err_file("solver.%J.err")
        .with_res_req("select[mem>100]")
        .with_project("cfd")
        .with_mail_user("alice@example.org")
        .with_begin_time(begin)
        .with_term_time(term)
        .with_limit(rlimit::CPU, 3600)
        .with_file(XFile::stage_in("mesh.dat", "/tmp/mesh.dat"))
        .notify_end()
        .exclusive();

    let reply = session.submit(&request).await.unwrap();
    let job_id = reply.job_id.unwrap();

    let jobs = session.jobs(&JobFilter::by_id(job_id)).await.unwrap();
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.submit, request);
    assert_eq!(job.j_name, "solver");
    // begin time is in the future
    assert_eq!(job.state(), JobState::Pend);
    assert_eq!(session.cursor_state(), CursorState::Closed);
}

#[tokio::test]
async fn test_master_rejects_unknown_asked_host() {
    let mut session = session().await;
    let request = Submit::new("hostname").with_hosts(["node01", "node09"]);
    let reply = session.submit(&request).await.unwrap();

    let rejection = reply.rejection.unwrap();
    assert_eq!(rejection.field, Some(SubmitField::AskedHosts));
    assert_eq!(rejection.index, Some(1));
    assert_eq!(session.last_result(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_restricted_queue_is_permission_denied() {
    let mut session = session().await;
    let reply = session
        .submit(&Submit::new("reboot").with_queue("admin"))
        .await
        .unwrap();
    assert!(!reply.is_accepted());
    assert_eq!(session.last_result(), ErrorKind::PermissionDenied);

    let mut root = Session::init(SimMaster::seeded().with_user("root"), ClientConfig::default())
        .await
        .unwrap();
    let reply = root
        .submit(&Submit::new("reboot").with_queue("admin"))
        .await
        .unwrap();
    assert!(reply.is_accepted());
}

#[tokio::test]
async fn test_peek() {
    let mut session = session().await;
    let job_id = session
        .submit(&Submit::new("sleep 30"))
        .await
        .unwrap()
        .job_id
        .unwrap();
    let path = session.peek_job(job_id).await.unwrap();
    assert!(path.ends_with(&format!("{job_id}.out")), "{path}");

    let err = session.peek_job(2).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    let err = session.peek_job(424_242).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_pending_reasons_of_seeded_job() {
    let mut session = session().await;
    let jobs = session.jobs(&JobFilter::by_user("bob")).await.unwrap();
    assert_eq!(jobs.len(), 1);
    let reasons = job_pending_reasons(&jobs[0], &LoadIndexLog::default());
    assert_eq!(reasons, vec!["Not enough job slots: 2 hosts"]);
}

#[tokio::test]
async fn test_independent_cursors_per_session() {
    let master = SimMaster::seeded();
    let cluster = master.cluster();
    let mut first = Session::init(master, ClientConfig::default()).await.unwrap();
    let mut second = Session::init(SimMaster::new(cluster), ClientConfig::default())
        .await
        .unwrap();

    assert_eq!(first.open_jobs(&JobFilter::all()).await.unwrap(), 3);
    assert_eq!(second.open_jobs(&JobFilter::by_user("bob")).await.unwrap(), 1);
    assert_eq!(first.read_job().await.unwrap().unwrap().job_id, 1);
    assert_eq!(second.read_job().await.unwrap().unwrap().job_id, 2);
    assert_eq!(first.read_job().await.unwrap().unwrap().job_id, 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_master_times_out() {
    let config = ClientConfig {
        timeout_seconds: 1,
        ..ClientConfig::default()
    };
    let mut session = Session::init(SimMaster::seeded(), config).await.unwrap();
    session.open_jobs(&JobFilter::all()).await.unwrap();

    session.transport_mut().faults = Faults::latency(Duration::from_secs(5));
    let err = session.read_job().await.unwrap_err();
    assert!(matches!(err, LavaError::Timeout { .. }));
    assert_eq!(session.last_result(), ErrorKind::ConnectionTimeout);
    assert_eq!(session.cursor_state(), CursorState::Closed);

    session.transport_mut().faults = Faults::default();
    assert_eq!(session.cluster_name().await.unwrap(), "lava");
}

#[tokio::test]
async fn test_lost_master_breaks_session_until_reinit() {
    let mut session = session().await;
    session.transport_mut().faults = Faults::offline();

    let err = session.cluster_name().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionError);
    assert!(session.is_broken());

    session.transport_mut().faults = Faults::default();
    let err = session.queue_info(&[]).await.unwrap_err();
    assert!(matches!(err, LavaError::ConnectionBroken));
    assert_eq!(session.last_result(), ErrorKind::ConnectionError);

    session.reinit().await.unwrap();
    assert_eq!(session.transport().app_name(), Some("lava"));
    assert_eq!(session.queue_info(&[]).await.unwrap().len(), 5);
}
