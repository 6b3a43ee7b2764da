use looks_core::{LookId, TreeUpdate};
use looks_engine::{EngineError, ReorderError, ReorderRow};
use looks_harness::{FakeRequest, TestSite};
use looks_storage::LookStorage;

/// Four roots `a b c k` with weights normalized to 1..=4.
fn flat_site() -> Result<(TestSite, Vec<LookId>), Box<dyn std::error::Error>> {
    let mut site = TestSite::new()?;
    let mut ids = Vec::new();
    for name in ["a", "b", "c", "k"] {
        ids.push(site.add(name, None, None)?.id);
    }
    let rows: Vec<ReorderRow> = ids.iter().map(|id| ReorderRow::root(*id)).collect();
    assert_eq!(site.looks.reorder(&rows)?.len(), 4);
    Ok((site, ids))
}

fn snapshot(site: &TestSite) -> Result<Vec<(LookId, Option<LookId>, i64)>, Box<dyn std::error::Error>> {
    Ok(site
        .looks
        .storage()
        .tree_rows()?
        .into_iter()
        .map(|row| (row.id, row.parent, row.weight))
        .collect())
}

#[test]
fn resubmitting_the_same_order_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let (mut site, ids) = flat_site()?;
    let rows: Vec<ReorderRow> = ids.iter().map(|id| ReorderRow::root(*id)).collect();
    assert!(site.looks.reorder(&rows)?.is_empty());
    Ok(())
}

#[test]
fn only_the_changed_weight_is_written() -> Result<(), Box<dyn std::error::Error>> {
    let (mut site, ids) = flat_site()?;
    let k = ids[3];
    site.looks.storage_mut().reparent_and_reweight(&[TreeUpdate {
        id: k,
        parent: None,
        weight: 40,
    }])?;

    let rows: Vec<ReorderRow> = ids.iter().map(|id| ReorderRow::root(*id)).collect();
    assert_eq!(site.looks.reorder(&rows)?, vec![k]);
    assert_eq!(site.looks.load_look(k)?.ok_or("k missing")?.weight, 4);
    Ok(())
}

#[test]
fn only_the_moved_look_is_written() -> Result<(), Box<dyn std::error::Error>> {
    let (mut site, ids) = flat_site()?;
    let (a, b, c, k) = (ids[0], ids[1], ids[2], ids[3]);

    let written = site.looks.reorder(&[
        ReorderRow::root(a),
        ReorderRow::root(b),
        ReorderRow::root(c),
        ReorderRow::child(k, c),
    ])?;
    assert_eq!(written, vec![k]);
    assert_eq!(site.looks.load_look(k)?.ok_or("k missing")?.parent, Some(c));
    Ok(())
}

#[test]
fn nesting_follows_submission_order() -> Result<(), Box<dyn std::error::Error>> {
    let (mut site, ids) = flat_site()?;
    let (a, b, c, k) = (ids[0], ids[1], ids[2], ids[3]);

    site.looks.reorder(&[
        ReorderRow::root(c),
        ReorderRow::child(a, c),
        ReorderRow::child(k, a),
        ReorderRow::child(b, c),
    ])?;

    let outline: Vec<(LookId, usize)> = site
        .looks
        .outline()?
        .into_iter()
        .map(|row| (row.id, row.depth))
        .collect();
    assert_eq!(outline, vec![(c, 0), (a, 1), (k, 2), (b, 1)]);

    let weights: Vec<i64> = [c, a, k, b]
        .iter()
        .map(|id| site.looks.load_look(*id).map(|look| look.map(|l| l.weight)))
        .collect::<Result<Option<Vec<_>>, _>>()?
        .ok_or("look missing")?;
    assert_eq!(weights, vec![1, 2, 3, 4]);
    Ok(())
}

#[test]
fn malformed_submission_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let (mut site, ids) = flat_site()?;
    let (a, b, c, k) = (ids[0], ids[1], ids[2], ids[3]);
    let before = snapshot(&site)?;

    // k claims a parent that only appears after it
    let err = site
        .looks
        .reorder(&[
            ReorderRow::root(a),
            ReorderRow::child(b, a),
            ReorderRow::child(k, c),
            ReorderRow::root(c),
        ])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Reorder(ReorderError::ParentNotPreceding { id, parent }) if id == k && parent == c
    ));
    assert_eq!(snapshot(&site)?, before);

    let err = site
        .looks
        .reorder(&[ReorderRow::root(a), ReorderRow::root(LookId::new(999))])
        .unwrap_err();
    assert!(matches!(err, EngineError::Reorder(ReorderError::UnknownLook(_))));
    assert_eq!(snapshot(&site)?, before);
    Ok(())
}

#[test]
fn reorder_invalidates_moved_looks() -> Result<(), Box<dyn std::error::Error>> {
    let mut site = TestSite::new()?;
    let themed = site.add("themed", None, Some("olivero"))?;
    let plain = site.add("plain", None, None)?;

    let request = FakeRequest::new().with_query("look", "plain");
    assert_eq!(site.resolve(&request)?.as_deref().and_then(|r| r.theme()), None);

    site.looks
        .reorder(&[ReorderRow::root(themed.id), ReorderRow::child(plain.id, themed.id)])?;
    assert_eq!(
        site.resolve(&request)?.as_deref().and_then(|r| r.theme()),
        Some("olivero")
    );
    Ok(())
}

#[test]
fn raw_client_rows() -> Result<(), Box<dyn std::error::Error>> {
    let (mut site, ids) = flat_site()?;
    let (a, b) = (ids[0], ids[1]);
    let rows: Vec<ReorderRow> = [(a.get(), 0), (b.get(), a.get()), (ids[2].get(), 0), (ids[3].get(), 0)]
        .into_iter()
        .filter_map(|(id, parent)| ReorderRow::from_raw(id, parent))
        .collect();
    assert_eq!(site.looks.reorder(&rows)?, vec![b]);
    assert_eq!(site.looks.load_look(b)?.ok_or("b missing")?.parent, Some(a));
    Ok(())
}
