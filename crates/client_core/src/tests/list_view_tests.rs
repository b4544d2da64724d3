use super::*;

fn trucks(ids: &[&str]) -> Vec<Truck> {
    ids.iter().map(|id| Truck::new(*id)).collect()
}

#[test]
fn empty_sequence_renders_header_only() {
    let mut list = TruckList::new();
    let rendered = list.render(ConnectionStatus::Connecting, &[]);
    assert_eq!(rendered.header, "Trucks - state [CONNECTING]");
    assert!(rendered.rows.is_empty());
    assert!(rendered.changes.is_empty());
    assert!(list.is_empty());
}

#[test]
fn replacing_the_sequence_only_touches_changed_keys() {
    let mut list = TruckList::new();
    let first = list.render(ConnectionStatus::Open, &trucks(&["A", "B"]));
    assert_eq!(first.header, "Trucks - state [OPEN]");
    assert_eq!(first.keys(), ["A", "B"]);
    assert_eq!(
        first.changes,
        [
            RowChange::Added { key: "A".into(), index: 0 },
            RowChange::Added { key: "B".into(), index: 1 },
        ]
    );

    let second = list.render(ConnectionStatus::Open, &trucks(&["B", "C"]));
    assert_eq!(second.keys(), ["B", "C"]);
    assert_eq!(
        second.changes,
        [
            RowChange::Removed { key: "A".into() },
            RowChange::Added { key: "C".into(), index: 1 },
        ]
    );
    assert_eq!(second.mount_of("B"), first.mount_of("B"));
    assert_ne!(second.mount_of("C"), first.mount_of("A"));
}

#[test]
fn removing_one_truck_removes_exactly_one_row() {
    let ids = ["t1", "t2", "t3", "t4", "t5", "t6"];
    for removed in 0..ids.len() {
        let mut list = TruckList::new();
        let before = list.render(ConnectionStatus::Open, &trucks(&ids));

        let remaining: Vec<&str> = ids
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != removed)
            .map(|(_, id)| *id)
            .collect();
        let after = list.render(ConnectionStatus::Open, &trucks(&remaining));

        assert_eq!(
            after.changes,
            [RowChange::Removed {
                key: ids[removed].to_string()
            }]
        );
        assert_eq!(after.rows.len(), before.rows.len() - 1);
        for key in remaining {
            assert_eq!(after.mount_of(key), before.mount_of(key), "{key} remounted");
        }
    }
}

#[test]
fn changed_content_is_an_update_with_the_same_mount() {
    let mut list = TruckList::new();
    let before = list.render(
        ConnectionStatus::Open,
        &[Truck::new("A").with_attribute("city", "Gdansk")],
    );
    let after = list.render(
        ConnectionStatus::Open,
        &[Truck::new("A").with_attribute("city", "Poznan")],
    );
    assert_eq!(
        after.changes,
        [RowChange::Updated { key: "A".into(), index: 0 }]
    );
    assert_eq!(after.mount_of("A"), before.mount_of("A"));
    assert_eq!(after.rows[0].text, "A  city=Poznan");
}

#[test]
fn reordering_keeps_mounts_and_reports_nothing() {
    let mut list = TruckList::new();
    let before = list.render(ConnectionStatus::Open, &trucks(&["A", "B", "C"]));
    let after = list.render(ConnectionStatus::Open, &trucks(&["C", "A", "B"]));
    assert!(after.changes.is_empty());
    assert_eq!(after.keys(), ["C", "A", "B"]);
    for key in ["A", "B", "C"] {
        assert_eq!(after.mount_of(key), before.mount_of(key));
    }
}

#[test]
fn duplicate_ids_keep_the_first_occurrence() {
    let mut list = TruckList::new();
    let rendered = list.render(
        ConnectionStatus::Open,
        &[
            Truck::new("A").with_attribute("load", "wood"),
            Truck::new("B"),
            Truck::new("A").with_attribute("load", "iron"),
        ],
    );
    assert_eq!(rendered.keys(), ["A", "B"]);
    assert_eq!(rendered.rows[0].text, "A  load=wood");
}

#[test]
fn a_key_that_returns_gets_a_new_mount() {
    let mut list = TruckList::new();
    let first = list.render(ConnectionStatus::Open, &trucks(&["A"]));
    list.render(ConnectionStatus::Open, &[]);
    let again = list.render(ConnectionStatus::Open, &trucks(&["A"]));
    assert_ne!(again.mount_of("A"), first.mount_of("A"));
}

#[test]
fn diff_by_key_works_on_any_keyed_type() {
    #[derive(PartialEq)]
    struct City(&'static str, u32);

    impl Keyed for City {
        fn key(&self) -> &str {
            self.0
        }
    }

    let changes = diff_by_key(
        &[City("Lodz", 1), City("Opole", 2)],
        &[City("Opole", 3), City("Torun", 1)],
    );
    assert_eq!(
        changes,
        [
            RowChange::Removed { key: "Lodz".into() },
            RowChange::Updated { key: "Opole".into(), index: 0 },
            RowChange::Added { key: "Torun".into(), index: 1 },
        ]
    );
}

#[test]
fn header_covers_every_status() {
    let mut list = TruckList::new();
    for status in ConnectionStatus::ALL {
        let rendered = list.render_props(status, &TruckListProps::default());
        assert_eq!(rendered.header, format!("Trucks - state [{}]", status.label()));
    }
}

#[test]
fn display_prints_header_divider_and_rows() {
    let mut list = TruckList::new();
    let rendered = list.render(
        ConnectionStatus::Closed,
        &[Truck::new("A").with_attribute("capacity", 12)],
    );
    assert_eq!(
        rendered.to_string(),
        "Trucks - state [CLOSED]\n-----------------------\nA  capacity=12\n"
    );
}
