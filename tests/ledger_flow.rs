use std::{sync::Arc, thread};
use task_merkle::{
    leaf_digest, CollectionId, Committer, Error, InMemoryLedger, Keccak256, Ledger, LedgerConfig,
    Task, TaskStatus, TaskTree,
};

const CONFIG: &str = r#"{
    "rpc_url": "https://rpc.sepolia.org",
    "contract_address": "0x5FbDB2315678afecb367f032d93F642f64180aa3"
}"#;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn project_tasks(project: usize, count: usize) -> Vec<Task> {
    (0..count)
        .map(|i| {
            let status = match i % 3 {
                0 => TaskStatus::Todo,
                1 => TaskStatus::InProgress,
                _ => TaskStatus::Done,
            };
            Task::new(format!("{project}-{i}"), format!("task {i} of {project}"), status)
        })
        .collect()
}

#[test]
fn commit_then_prove_through_ledger() {
    init_logger();
    let config = LedgerConfig::from_json_str(CONFIG).unwrap();
    let ledger = InMemoryLedger::new(&config).unwrap();
    let committer = Committer::new(config, ledger).unwrap();

    let tasks = project_tasks(1, 5);
    let commitment = committer.commit_tasks("project-1", &tasks).unwrap();
    assert_eq!(
        commitment.root,
        *TaskTree::from_records(&tasks).unwrap().root()
    );

    for task in &tasks {
        assert!(committer.verify_task("project-1", task, &tasks).unwrap());
    }

    // the ledger accepts the proof only against the root it stored
    let tree = TaskTree::from_records(&tasks).unwrap();
    let leaf = leaf_digest::<Keccak256, _>(&tasks[3]).unwrap();
    let hex_proof = tree.prove_leaf(&leaf).unwrap().to_hex_vec();
    let ledger = committer.ledger();
    assert!(ledger
        .remote_verify(&commitment.collection, &hex_proof, &leaf.to_hex())
        .unwrap());
    assert!(matches!(
        ledger.remote_verify(&CollectionId::from_name("project-2"), &hex_proof, &leaf.to_hex()),
        Err(Error::UnknownCollection(_))
    ));
}

#[test]
fn recommit_moves_the_root() {
    init_logger();
    let config = LedgerConfig::from_json_str(CONFIG).unwrap();
    let committer = Committer::new(config.clone(), InMemoryLedger::new(&config).unwrap()).unwrap();

    let mut tasks = project_tasks(7, 4);
    let before = committer.commit_tasks("project-7", &tasks).unwrap();
    tasks.push(Task::new("7-4", "late addition", TaskStatus::Todo));
    let after = committer.commit_tasks("project-7", &tasks).unwrap();

    assert_ne!(before.root, after.root);
    assert!(committer.verify_task("project-7", &tasks[4], &tasks).unwrap());
    assert!(!committer
        .verify_task("project-7", &tasks[0], &tasks[..4])
        .unwrap());
}

#[test]
fn concurrent_commitments_are_independent() {
    init_logger();
    let config = LedgerConfig::from_json_str(CONFIG).unwrap();
    let ledger = InMemoryLedger::new(&config).unwrap();
    let committer = Arc::new(Committer::new(config, ledger).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|project| {
            let committer = Arc::clone(&committer);
            thread::spawn(move || {
                let name = format!("project-{project}");
                let tasks = project_tasks(project, project + 1);
                let commitment = committer.commit_tasks(&name, &tasks).unwrap();
                let all_valid = tasks
                    .iter()
                    .all(|task| committer.verify_task(&name, task, &tasks).unwrap());
                (commitment, all_valid)
            })
        })
        .collect();

    for handle in handles {
        let (commitment, all_valid) = handle.join().unwrap();
        assert!(all_valid);
        assert_eq!(
            committer.ledger().root_of(&commitment.collection).unwrap(),
            Some(commitment.root)
        );
    }
    assert_eq!(committer.ledger().num_collections(), 8);
}
