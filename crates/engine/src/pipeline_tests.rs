use super::*;
use kit_core::FailurePolicy;

#[test]
fn builder_keeps_declaration_order() {
    let pipeline = Pipeline::new("deploy")
        .then(Step::shell("build", "make"))
        .then(Pipeline::new("db").then(Step::shell("migrate", "migrate up")))
        .then(ParallelGroup::new(
            "warm",
            vec![Step::shell("a", "curl a"), Step::shell("b", "curl b")],
        ));

    let names: Vec<&str> = pipeline.nodes().iter().map(Node::name).collect();
    assert_eq!(names, vec!["build", "db", "warm"]);
    assert_eq!(pipeline.policy(), FailurePolicy::Abort);
    assert_eq!(pipeline.step_count(), 4);
}

#[test]
fn hooks_count_as_steps() {
    let pipeline = Pipeline::new("deploy")
        .pre(Step::shell("pre", "check"))
        .post(Step::shell("post", "notify"))
        .then(Step::shell("build", "make"));

    assert_eq!(pipeline.step_count(), 3);
    assert_eq!(pipeline.pre_hook().map(Step::name), Some("pre"));
    assert_eq!(pipeline.post_hook().map(Step::name), Some("post"));
}

#[test]
fn parallel_group_defaults_to_one_worker_per_step() {
    let group = ParallelGroup::new("g", vec![Step::shell("a", "a"), Step::shell("b", "b")]);
    assert_eq!(group.worker_count(), 2);
    assert_eq!(group.clone().max_workers(1).worker_count(), 1);
    assert_eq!(ParallelGroup::new("empty", vec![]).worker_count(), 1);
}
