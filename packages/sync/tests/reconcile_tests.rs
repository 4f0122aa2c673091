//! End-to-end save tests against the in-memory backend
//!
//! This tests:
//! - Load → edit → save → apply round trips
//! - Create-then-update ordering and parent resolution
//! - Delete detection and reconciliation idempotence
//! - Partial and transport failures, and retrying after them
//! - Per-menu save serialization

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use trellis_editor::{BlockNode, ClientId, Editor, EditorCommand, MoveDirection, TreeCommand};
use trellis_sync::{
    InMemoryMenuItems, MenuItem, MenuItemFields, NavigationSync, Reconciler, RemoteCall,
    SaveLocks, SyncConfig, SyncError,
};

const MENU: u64 = 3;

fn item(id: u64, title: &str, parent: u64, menu_order: u32) -> MenuItem {
    MenuItem {
        id,
        fields: MenuItemFields {
            title: title.into(),
            url: format!("/{}", title.to_lowercase()),
            parent,
            menu_order,
            menus: MENU,
            object: Some("custom".into()),
            kind: Some("custom".into()),
            status: Some("publish".into()),
            ..Default::default()
        },
    }
}

fn link(title: &str) -> BlockNode {
    BlockNode::new("navigation-link")
        .attribute("label", title)
        .attribute("url", format!("/{}", title.to_lowercase()))
        .attribute("type", "custom")
        .attribute("kind", "custom")
}

fn append(root: &ClientId, blocks: Vec<BlockNode>) -> EditorCommand {
    EditorCommand::Edit(TreeCommand::InsertBlocks {
        blocks,
        parent: Some(root.clone()),
        index: None,
    })
}

struct Fixture {
    api: Arc<InMemoryMenuItems>,
    sync: NavigationSync<InMemoryMenuItems>,
    editor: Mutex<Editor>,
    root: ClientId,
}

impl Fixture {
    async fn load(api: InMemoryMenuItems) -> Self {
        let api = Arc::new(api);
        let sync = NavigationSync::new(Arc::clone(&api), SyncConfig::default());
        let loaded = sync.load(MENU).await.unwrap();
        let root = loaded.root.id.clone();
        Self {
            api,
            sync,
            editor: Mutex::new(Editor::with_blocks(vec![loaded.root])),
            root,
        }
    }

    fn editor(&mut self) -> &mut Editor {
        self.editor.get_mut()
    }

    fn top_level(&mut self) -> Vec<ClientId> {
        let root = self.root.clone();
        self.editor().tree().children(Some(&root)).to_vec()
    }

    fn insert(&mut self, blocks: Vec<BlockNode>) {
        let command = append(&self.root, blocks);
        self.editor().dispatch(command);
    }

    fn record_id(&mut self, id: &ClientId) -> Option<u64> {
        self.editor().tree().block(id).and_then(|b| b.record_id())
    }

    /// Save and return (created, updated, deleted)
    async fn save(&self) -> Result<(usize, usize, usize), SyncError> {
        let report = self.sync.save(MENU, &self.editor, &self.root).await;
        let summary = report.outcome?;
        Ok((summary.created, summary.updated, summary.deleted))
    }

    async fn call_count(&self) -> usize {
        self.api.calls().await.len()
    }
}

#[tokio::test]
async fn test_load_builds_nested_blocks() {
    let mut fixture = Fixture::load(InMemoryMenuItems::with_items(vec![
        item(1, "Docs", 0, 1),
        item(2, "Install", 1, 2),
        item(3, "Intro", 1, 1),
        item(4, "Home", 0, 0),
    ]))
    .await;

    let blocks = fixture.editor().blocks();
    assert_eq!(blocks.len(), 1);
    let menu = &blocks[0].inner_blocks;
    let labels: Vec<&str> = menu
        .iter()
        .map(|block| block.attributes["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Home", "Docs"]);

    assert_eq!(menu[0].name, "navigation-link");
    assert_eq!(menu[1].name, "navigation-submenu");
    let children: Vec<&str> = menu[1]
        .inner_blocks
        .iter()
        .map(|block| block.attributes["label"].as_str().unwrap())
        .collect();
    assert_eq!(children, vec!["Intro", "Install"]);
    assert!(!fixture.editor().is_dirty());
}

#[tokio::test]
async fn test_unedited_menu_saves_nothing() {
    let fixture = Fixture::load(InMemoryMenuItems::with_items(vec![
        item(1, "Home", 0, 1),
        item(2, "Docs", 0, 2),
        item(3, "Intro", 2, 1),
    ]))
    .await;
    let before = fixture.call_count().await;

    assert_eq!(fixture.save().await.unwrap(), (0, 0, 0));

    // The list the diff ran against, and the re-list after the save
    let calls = fixture.api.calls().await;
    assert_eq!(
        &calls[before..],
        &[RemoteCall::List { menus: MENU }, RemoteCall::List { menus: MENU }]
    );
}

#[tokio::test]
async fn test_create_then_update() {
    let mut fixture =
        Fixture::load(InMemoryMenuItems::with_items(vec![item(1, "Home", 0, 1)])).await;

    let docs = link("Docs");
    let docs_id = docs.id.clone();
    let intro = link("Intro");
    let intro_id = intro.id.clone();
    fixture.insert(vec![docs.inner_blocks(vec![intro])]);
    assert!(fixture.editor().is_dirty());

    let before = fixture.call_count().await;
    assert_eq!(fixture.save().await.unwrap(), (2, 0, 0));

    // Parents are created before children, and no batch was needed
    let calls = fixture.api.calls().await;
    assert_eq!(
        &calls[before..],
        &[
            RemoteCall::List { menus: MENU },
            RemoteCall::Create {
                title: "Docs".into()
            },
            RemoteCall::Create {
                title: "Intro".into()
            },
            RemoteCall::List { menus: MENU },
        ]
    );

    let docs_record = fixture.record_id(&docs_id).unwrap();
    let intro_record = fixture.record_id(&intro_id).unwrap();
    let stored: Vec<MenuItem> = fixture.api.items().await;
    let intro_item = stored.iter().find(|i| i.id == intro_record).unwrap();
    assert_eq!(intro_item.fields.parent, docs_record);
    assert_eq!(intro_item.fields.menu_order, 1);
    assert_eq!(intro_item.fields.status.as_deref(), Some("publish"));
    assert!(!fixture.editor().is_dirty());

    // Editing a created block is a plain update on the next save
    let mut attributes = trellis_editor::Attributes::new();
    attributes.insert("label".into(), "Guide".into());
    fixture
        .editor()
        .dispatch(EditorCommand::Edit(TreeCommand::UpdateAttributes {
            id: intro_id,
            attributes,
        }));
    assert_eq!(fixture.save().await.unwrap(), (0, 1, 0));

    let stored = fixture.api.items().await;
    let intro_item = stored.iter().find(|i| i.id == intro_record).unwrap();
    assert_eq!(intro_item.fields.title, "Guide");
    assert_eq!(intro_item.fields.parent, docs_record);
}

#[tokio::test]
async fn test_save_is_idempotent() {
    let mut fixture =
        Fixture::load(InMemoryMenuItems::with_items(vec![item(1, "Home", 0, 1)])).await;
    fixture.insert(vec![link("Blog")]);

    assert_eq!(fixture.save().await.unwrap(), (1, 0, 0));
    assert_eq!(fixture.save().await.unwrap(), (0, 0, 0));
    assert_eq!(fixture.api.items().await.len(), 2);
}

#[tokio::test]
async fn test_removed_block_is_deleted() {
    let mut fixture = Fixture::load(InMemoryMenuItems::with_items(vec![
        item(1, "Home", 0, 1),
        item(2, "Docs", 0, 2),
    ]))
    .await;

    let docs = fixture.top_level()[1].clone();
    fixture
        .editor()
        .dispatch(EditorCommand::Edit(TreeCommand::RemoveBlocks(vec![docs])));

    assert_eq!(fixture.save().await.unwrap(), (0, 0, 1));
    let remaining: Vec<u64> = fixture.api.items().await.iter().map(|i| i.id).collect();
    assert_eq!(remaining, vec![1]);
}

#[tokio::test]
async fn test_move_updates_sibling_order() {
    let mut fixture = Fixture::load(InMemoryMenuItems::with_items(vec![
        item(1, "Home", 0, 1),
        item(2, "Docs", 0, 2),
    ]))
    .await;

    let docs = fixture.top_level()[1].clone();
    let root = fixture.root.clone();
    fixture
        .editor()
        .dispatch(EditorCommand::Edit(TreeCommand::MoveBlocks {
            ids: vec![docs],
            direction: MoveDirection::Up,
            parent: Some(root),
        }));

    assert_eq!(fixture.save().await.unwrap(), (0, 2, 0));
    let order: Vec<(u64, u32)> = fixture
        .api
        .items()
        .await
        .iter()
        .map(|i| (i.id, i.fields.menu_order))
        .collect();
    assert_eq!(order, vec![(1, 2), (2, 1)]);
}

#[tokio::test]
async fn test_partial_failure_reports_ids_without_rollback() {
    let mut fixture = Fixture::load(InMemoryMenuItems::with_items(vec![
        item(1, "Home", 0, 1),
        item(2, "Docs", 0, 2),
        item(3, "Blog", 0, 3),
    ]))
    .await;
    fixture.api.reject_delete(1).await;

    // Remove Home (rejected) and move Blog up (applied)
    let ids = fixture.top_level();
    let root = fixture.root.clone();
    fixture
        .editor()
        .dispatch(EditorCommand::Edit(TreeCommand::RemoveBlocks(vec![ids[0].clone()])));
    fixture
        .editor()
        .dispatch(EditorCommand::Edit(TreeCommand::MoveBlocks {
            ids: vec![ids[2].clone()],
            direction: MoveDirection::Up,
            parent: Some(root),
        }));

    let err = fixture.save().await.unwrap_err();
    assert_eq!(err, SyncError::PartialFailure { failed: vec![1] });
    assert!(fixture.editor().is_dirty());

    let stored = fixture.api.items().await;
    let blog = stored.iter().find(|i| i.id == 3).unwrap();
    assert_eq!(blog.fields.menu_order, 1);
    assert!(stored.iter().any(|i| i.id == 1));
}

#[tokio::test]
async fn test_retry_after_partial_failure_skips_applied_operations() {
    let mut fixture = Fixture::load(InMemoryMenuItems::with_items(vec![
        item(1, "Home", 0, 1),
        item(2, "Docs", 0, 2),
        item(3, "Blog", 0, 3),
    ]))
    .await;
    fixture.api.reject_update(3).await;

    // Removing Docs deletes item 2 and moves Blog to position 2
    let docs = fixture.top_level()[1].clone();
    fixture
        .editor()
        .dispatch(EditorCommand::Edit(TreeCommand::RemoveBlocks(vec![docs])));

    let err = fixture.save().await.unwrap_err();
    assert_eq!(err, SyncError::PartialFailure { failed: vec![3] });
    let remaining: Vec<u64> = fixture.api.items().await.iter().map(|i| i.id).collect();
    assert_eq!(remaining, vec![1, 3]);

    // The retry only resends what is still out of date
    let before = fixture.call_count().await;
    let err = fixture.save().await.unwrap_err();
    assert_eq!(err, SyncError::PartialFailure { failed: vec![3] });

    let calls = fixture.api.calls().await;
    assert!(calls[before..].contains(&RemoteCall::Batch { operations: 1 }));
    assert!(fixture.editor().is_dirty());
}

#[tokio::test]
async fn test_transport_failure_is_passed_through() {
    let mut fixture =
        Fixture::load(InMemoryMenuItems::with_items(vec![item(1, "Home", 0, 1)])).await;
    fixture.insert(vec![link("Blog")]);
    fixture.api.set_offline(true).await;

    let err = fixture.save().await.unwrap_err();
    assert_eq!(err, SyncError::Transport("Network request failed".into()));
    assert_eq!(err.to_string(), "Network request failed");
    assert!(fixture.editor().is_dirty());
}

#[tokio::test]
async fn test_failed_placeholder_stops_before_batch() {
    let mut fixture = Fixture::load(InMemoryMenuItems::with_items(vec![
        item(1, "Home", 0, 1),
        item(2, "Docs", 0, 2),
    ]))
    .await;
    fixture.api.reject_create_titled("Broken").await;

    let blog = link("Blog");
    let blog_id = blog.id.clone();
    let broken = link("Broken");
    let broken_id = broken.id.clone();
    fixture.insert(vec![blog, broken]);
    let docs = fixture.top_level()[1].clone();
    fixture
        .editor()
        .dispatch(EditorCommand::Edit(TreeCommand::RemoveBlocks(vec![docs])));

    let report = fixture
        .sync
        .save(MENU, &fixture.editor, &fixture.root)
        .await;

    assert!(matches!(
        &report.outcome,
        Err(SyncError::PlaceholderCreation { client_id, .. }) if *client_id == broken_id
    ));
    assert_eq!(report.assigned.len(), 1);
    assert_eq!(report.assigned[0].0, blog_id);

    let calls = fixture.api.calls().await;
    assert!(!calls
        .iter()
        .any(|call| matches!(call, RemoteCall::Batch { .. })));
    assert_eq!(fixture.api.items().await.len(), 3);

    // The created item is recorded so a retry does not duplicate it
    assert_eq!(fixture.record_id(&blog_id), Some(report.assigned[0].1));
    assert_eq!(fixture.record_id(&broken_id), None);
    assert!(fixture.editor().is_dirty());
}

#[tokio::test]
async fn test_record_ids_survive_undo_redo() {
    let mut fixture =
        Fixture::load(InMemoryMenuItems::with_items(vec![item(1, "Home", 0, 1)])).await;
    let blog = link("Blog");
    let blog_id = blog.id.clone();
    fixture.insert(vec![blog]);
    fixture.save().await.unwrap();

    fixture.editor().dispatch(EditorCommand::Undo);
    assert!(!fixture.editor().tree().contains(&blog_id));
    fixture.editor().dispatch(EditorCommand::Redo);

    // Redo brings the block back with its record id, so nothing is created twice
    assert!(fixture.record_id(&blog_id).is_some());
    assert_eq!(fixture.save().await.unwrap(), (0, 0, 0));
}

#[tokio::test]
async fn test_edit_during_save_keeps_document_dirty() {
    let api = InMemoryMenuItems::with_items(vec![item(1, "Home", 0, 1)])
        .with_latency(Duration::from_millis(20));
    let mut fixture = Fixture::load(api).await;
    let blog = link("Blog");
    let blog_id = blog.id.clone();
    fixture.insert(vec![blog]);
    let news = link("News");
    let news_id = news.id.clone();

    let (report, _) = tokio::join!(
        fixture.sync.save(MENU, &fixture.editor, &fixture.root),
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            fixture
                .editor
                .lock()
                .await
                .dispatch(append(&fixture.root, vec![news]));
        }
    );

    assert!(report.is_success());
    assert_eq!(report.assigned.len(), 1);
    assert!(fixture.editor().is_dirty());
    assert!(fixture.record_id(&blog_id).is_some());
    assert!(fixture.editor().tree().contains(&news_id));
    assert_eq!(fixture.record_id(&news_id), None);
}

#[tokio::test]
async fn test_concurrent_save_of_same_menu_is_refused() {
    let api = InMemoryMenuItems::with_items(vec![item(1, "Home", 0, 1)])
        .with_latency(Duration::from_millis(25));
    let mut fixture = Fixture::load(api).await;
    fixture.insert(vec![link("Blog")]);

    let (first, second) = tokio::join!(
        fixture.sync.save(MENU, &fixture.editor, &fixture.root),
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            fixture
                .sync
                .try_save(MENU, &fixture.editor, &fixture.root)
                .await
        }
    );

    assert!(first.is_success());
    assert!(second.is_none());
    assert!(!fixture.sync.locks().is_saving(MENU));
}

#[tokio::test]
async fn test_queued_save_sees_record_ids_of_earlier_save() {
    let api = InMemoryMenuItems::with_items(vec![item(1, "Home", 0, 1)])
        .with_latency(Duration::from_millis(20));
    let mut fixture = Fixture::load(api).await;
    let blog = link("Blog");
    let blog_id = blog.id.clone();
    fixture.insert(vec![blog]);

    let (first, second) = tokio::join!(
        fixture.sync.save(MENU, &fixture.editor, &fixture.root),
        fixture.sync.save(MENU, &fixture.editor, &fixture.root),
    );

    // Whichever save runs second finds nothing left to do
    let mut created: Vec<usize> = [first, second]
        .into_iter()
        .map(|report| {
            let summary = report.outcome.unwrap();
            assert_eq!((summary.updated, summary.deleted), (0, 0));
            summary.created
        })
        .collect();
    created.sort();
    assert_eq!(created, vec![0, 1]);

    let blogs: Vec<u64> = fixture
        .api
        .items()
        .await
        .iter()
        .filter(|i| i.fields.title == "Blog")
        .map(|i| i.id)
        .collect();
    assert_eq!(blogs.len(), 1);
    assert_eq!(fixture.record_id(&blog_id), Some(blogs[0]));
    assert!(!fixture.editor().is_dirty());
}

#[tokio::test]
async fn test_token_for_other_menu_is_rejected() {
    let mut fixture =
        Fixture::load(InMemoryMenuItems::with_items(vec![item(1, "Home", 0, 1)])).await;
    let locks = SaveLocks::new();
    let token = locks.acquire(MENU + 1).await;
    let config = SyncConfig::default();
    let tree = Arc::clone(fixture.editor().tree());

    let report = Reconciler::new(fixture.api.as_ref(), &config, MENU)
        .reconcile(&token, &tree, &fixture.root)
        .await;

    assert_eq!(
        report.outcome.unwrap_err(),
        SyncError::LockMismatch {
            expected: "navigation-post-3".into(),
            actual: "navigation-post-4".into(),
        }
    );
}

#[tokio::test]
async fn test_missing_root_fails() {
    let mut fixture = Fixture::load(InMemoryMenuItems::new()).await;
    let token = fixture.sync.locks().acquire(MENU).await;
    let config = SyncConfig::default();
    let missing = ClientId::from("not-a-block");
    let tree = Arc::clone(fixture.editor().tree());

    let report = Reconciler::new(fixture.api.as_ref(), &config, MENU)
        .reconcile(&token, &tree, &missing)
        .await;

    assert_eq!(report.outcome.unwrap_err(), SyncError::MissingRoot(missing));
}
