use async_trait::async_trait;
use chrono::NaiveDate;
use mockable::DefaultClock;
use mockall::mock;
use std::sync::Arc;
use taskretro_server::repository::RepositoryResult;
use taskretro_server::retrospective::{
    InMemoryRetrospectiveRepository, Retrospective, RetrospectiveCreateInput, RetrospectiveId,
    RetrospectiveRepository, RetrospectiveService, RetrospectiveServiceError,
};
use taskretro_server::task::{
    InMemoryTaskRepository, Task, TaskCreateInput, TaskId, TaskRepository, TaskService, TaskStatus,
};

mod common;

use common::FixedClock;

mock! {
    pub RetrospectiveRepo {}

    #[async_trait]
    impl RetrospectiveRepository for RetrospectiveRepo {
        async fn add(&self, retrospective: Retrospective) -> RepositoryResult<Retrospective>;
        async fn get(&self, id: RetrospectiveId) -> RepositoryResult<Option<Retrospective>>;
        async fn get_by_date(&self, date: NaiveDate) -> RepositoryResult<Option<Retrospective>>;
        async fn update(&self, retrospective: Retrospective) -> RepositoryResult<Retrospective>;
    }
}

mock! {
    pub TaskRepo {}

    #[async_trait]
    impl TaskRepository for TaskRepo {
        async fn add(&self, task: Task) -> RepositoryResult<Task>;
        async fn get(&self, id: TaskId) -> RepositoryResult<Option<Task>>;
        async fn list_by_status(&self, status: Option<TaskStatus>) -> RepositoryResult<Vec<Task>>;
        async fn update(&self, task: Task) -> RepositoryResult<Task>;
        async fn delete(&self, id: TaskId) -> RepositoryResult<()>;
    }
}

struct TestContext {
    tasks: Arc<InMemoryTaskRepository>,
    retrospectives: Arc<InMemoryRetrospectiveRepository>,
    task_service: TaskService,
    service: RetrospectiveService,
}

fn setup() -> TestContext {
    let tasks = Arc::new(InMemoryTaskRepository::new());
    let retrospectives = Arc::new(InMemoryRetrospectiveRepository::new());
    TestContext {
        task_service: TaskService::new(tasks.clone(), Arc::new(DefaultClock)),
        service: RetrospectiveService::new(
            retrospectives.clone(),
            tasks.clone(),
            Arc::new(DefaultClock),
        ),
        tasks,
        retrospectives,
    }
}

fn retro_input(title: &str, date: Option<NaiveDate>) -> RetrospectiveCreateInput {
    RetrospectiveCreateInput {
        title: title.to_string(),
        summary: None,
        date,
    }
}

async fn create_task(ctx: &TestContext, title: &str) -> TaskId {
    ctx.task_service
        .create_task(TaskCreateInput {
            title: title.to_string(),
            ..Default::default()
        })
        .await
        .expect("Failed to create task")
        .id
}

#[tokio::test]
async fn create_retrospective_defaults_to_today() {
    let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
    let service = RetrospectiveService::new(
        Arc::new(InMemoryRetrospectiveRepository::new()),
        Arc::new(InMemoryTaskRepository::new()),
        Arc::new(FixedClock::on(today)),
    );

    let created = service
        .create_retrospective(retro_input("Day 1", None))
        .await
        .expect("Failed to create retrospective");

    assert_eq!(created.date, today);
    assert!(created.tasks.is_empty());
}

#[tokio::test]
async fn create_retrospective_keeps_explicit_date_and_summary() {
    let ctx = setup();
    let date = NaiveDate::from_ymd_opt(2024, 12, 24).unwrap();

    let created = ctx
        .service
        .create_retrospective(RetrospectiveCreateInput {
            title: "Holiday".to_string(),
            summary: Some("Quiet day".to_string()),
            date: Some(date),
        })
        .await
        .unwrap();

    assert_eq!(created.date, date);
    assert_eq!(created.summary.as_deref(), Some("Quiet day"));
    assert_eq!(ctx.service.get_retrospective(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn attach_task_links_both_sides() {
    let ctx = setup();
    let task_id = create_task(&ctx, "Write report").await;
    let retro = ctx
        .service
        .create_retrospective(retro_input("Day 1", None))
        .await
        .unwrap();

    let attached = ctx.service.attach_task(retro.id, task_id).await.unwrap();

    assert_eq!(attached.tasks, vec![task_id]);
    let task = ctx.tasks.get(task_id).await.unwrap().unwrap();
    assert_eq!(task.retrospective_id(), Some(retro.id));
}

#[tokio::test]
async fn attach_task_twice_lists_task_once() {
    let ctx = setup();
    let task_id = create_task(&ctx, "Once").await;
    let retro = ctx
        .service
        .create_retrospective(retro_input("Day 1", None))
        .await
        .unwrap();

    ctx.service.attach_task(retro.id, task_id).await.unwrap();
    let attached = ctx.service.attach_task(retro.id, task_id).await.unwrap();

    assert_eq!(attached.tasks, vec![task_id]);
}

#[tokio::test]
async fn attach_task_with_unknown_task_mutates_nothing() {
    let ctx = setup();
    let retro = ctx
        .service
        .create_retrospective(retro_input("Day 1", None))
        .await
        .unwrap();
    let before = ctx.retrospectives.get(retro.id).await.unwrap();
    let missing = TaskId::new_v4();

    let result = ctx.service.attach_task(retro.id, missing).await;

    assert!(matches!(
        result,
        Err(RetrospectiveServiceError::TaskNotFound(id)) if id == missing
    ));
    assert_eq!(ctx.retrospectives.get(retro.id).await.unwrap(), before);
}

#[tokio::test]
async fn attach_task_with_unknown_retrospective_mutates_nothing() {
    let ctx = setup();
    let task_id = create_task(&ctx, "Lonely").await;
    let before = ctx.tasks.get(task_id).await.unwrap();
    let missing = RetrospectiveId::new_v4();

    let result = ctx.service.attach_task(missing, task_id).await;

    assert!(matches!(
        result,
        Err(RetrospectiveServiceError::RetrospectiveNotFound(id)) if id == missing
    ));
    assert_eq!(ctx.tasks.get(task_id).await.unwrap(), before);
}

#[tokio::test]
async fn attach_task_never_writes_when_task_lookup_fails() {
    let retro = Retrospective::new(
        "Day 1".to_string(),
        None,
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        &DefaultClock,
    );
    let retro_id = retro.id();

    let mut retrospectives = MockRetrospectiveRepo::new();
    retrospectives
        .expect_get()
        .returning(move |_| Ok(Some(retro.clone())));
    retrospectives.expect_update().never();

    let mut tasks = MockTaskRepo::new();
    tasks.expect_get().returning(|_| Ok(None));
    tasks.expect_update().never();

    let service = RetrospectiveService::new(
        Arc::new(retrospectives),
        Arc::new(tasks),
        Arc::new(DefaultClock),
    );

    let result = service.attach_task(retro_id, TaskId::new_v4()).await;

    assert!(matches!(result, Err(RetrospectiveServiceError::TaskNotFound(_))));
}

#[tokio::test]
async fn attach_task_saves_task_before_retrospective() {
    let retro = Retrospective::new(
        "Day 1".to_string(),
        None,
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        &DefaultClock,
    );
    let task = Task::new("Ordered".to_string(), None, None, &DefaultClock);
    let (retro_id, task_id) = (retro.id(), task.id());
    let mut sequence = mockall::Sequence::new();

    let mut retrospectives = MockRetrospectiveRepo::new();
    let mut tasks = MockTaskRepo::new();
    retrospectives
        .expect_get()
        .returning(move |_| Ok(Some(retro.clone())));
    tasks
        .expect_get()
        .returning(move |_| Ok(Some(task.clone())));
    tasks
        .expect_update()
        .times(1)
        .in_sequence(&mut sequence)
        .withf(move |task| task.retrospective_id() == Some(retro_id))
        .returning(|task| Ok(task));
    retrospectives
        .expect_update()
        .times(1)
        .in_sequence(&mut sequence)
        .withf(move |retro| retro.tasks() == [task_id])
        .returning(|retro| Ok(retro));

    let service = RetrospectiveService::new(
        Arc::new(retrospectives),
        Arc::new(tasks),
        Arc::new(DefaultClock),
    );

    let attached = service.attach_task(retro_id, task_id).await.unwrap();

    assert_eq!(attached.tasks, vec![task_id]);
}

#[tokio::test]
async fn get_summary_returns_latest_retrospective_for_date() {
    let ctx = setup();
    let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
    ctx.service
        .create_retrospective(retro_input("Morning", Some(date)))
        .await
        .unwrap();
    let evening = ctx
        .service
        .create_retrospective(retro_input("Evening", Some(date)))
        .await
        .unwrap();

    let summary = ctx.service.get_summary(date).await.unwrap();

    assert_eq!(summary, Some(evening));
}

#[tokio::test]
async fn get_summary_returns_none_for_empty_day() {
    let ctx = setup();

    let summary = ctx
        .service
        .get_summary(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
        .await
        .unwrap();

    assert_eq!(summary, None);
}
