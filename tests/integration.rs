//! Integration tests for the lazy pipeline engine

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::rc::Rc;

use futures::StreamExt;
use lazyflow::prelude::*;
use lazyflow::sources::{LineSource, LineSourceConfig, MapSource};

#[test]
fn test_nothing_runs_before_a_terminal() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();

    let stream = times(100)
        .map(move |x| {
            counter.set(counter.get() + 1);
            x + 1
        })
        .filter(|x| x % 10 == 0)
        .skip(1)
        .take(2);
    assert_eq!(calls.get(), 0);

    assert_eq!(stream.result(), vec![20, 30]);
    assert_eq!(calls.get(), 30);
}

#[test]
fn test_first_and_contains_are_repeatable() {
    let mut stream = Stream::of(vec!["x", "y", "z"]).map(|s| s.to_string());

    assert_eq!(stream.first().get().map(String::as_str), Some("x"));
    assert_eq!(stream.first().get().map(String::as_str), Some("x"));
    assert!(stream.contains(&"y".to_string()));
    assert!(stream.contains(&"y".to_string()));
    assert!(!stream.is_empty());

    assert_eq!(stream.result(), vec!["x", "y", "z"]);
}

#[test]
fn test_flatten_absent_propagation() {
    let only_absent: Stream<Stream<i32>> = Stream::of(vec![Stream::absent(), Stream::absent()]);
    assert!(only_absent.flatten().is_absent());

    let mixed = Stream::of(vec![
        Stream::of(vec![1, 2]),
        Stream::absent(),
        Stream::of(vec![3, 4]),
    ]);
    assert_eq!(mixed.flatten().result(), vec![1, 2, 3, 4]);
}

#[derive(Debug, Clone, PartialEq)]
struct Tagged {
    key: u8,
    tag: &'static str,
}

#[test]
fn test_sort_by_key_is_stable() {
    let items = vec![
        Tagged { key: 2, tag: "a" },
        Tagged { key: 1, tag: "b" },
        Tagged { key: 2, tag: "c" },
        Tagged { key: 1, tag: "d" },
    ];
    let tags: Vec<_> = Stream::of(items)
        .sort_by_key(|t| t.key)
        .map(|t| t.tag)
        .result();
    assert_eq!(tags, vec!["b", "d", "a", "c"]);
}

#[test]
fn test_fault_short_circuits_and_keeps_prefix() {
    let stream = Stream::of(vec!["a", "b", "c", "d"]).try_map(|s| {
        if s == "c" {
            Err(Error::custom("c rejected"))
        } else {
            Ok(s.to_uppercase())
        }
    });

    let mut out = Vec::new();
    let res = stream.to_slice(&mut out);
    assert_eq!(out, vec!["A", "B"]);
    assert_eq!(res, Err(Error::custom("c rejected")));
}

#[test]
fn test_set_relations_with_absent_operand() {
    let kept = Stream::of(vec![1, 2, 3]).sub(Stream::absent()).result();
    assert_eq!(kept, vec![1, 2, 3]);

    assert!(Stream::of(vec![1, 2, 3]).interact(Stream::absent()).is_absent());

    let diff = Stream::of(vec![1, 2, 3, 4]).sub(Stream::of(vec![2, 4])).result();
    assert_eq!(diff, vec![1, 3]);

    let common = Stream::of(vec![1, 2, 3, 4])
        .interact(Stream::of(vec![4, 1, 9]))
        .result();
    assert_eq!(common, vec![1, 4]);
}

#[test]
fn test_partition() {
    let batches = Stream::of(vec![1, 2, 3, 4]).partition(3).result();
    assert_eq!(batches, vec![vec![1, 2, 3], vec![4]]);

    let by_marker = Stream::of(vec![1, 0, 2, 3, 0, 4])
        .partition_by(|x| *x == 0, false)
        .result();
    assert_eq!(by_marker, vec![vec![1], vec![2, 3], vec![4]]);
}

#[test]
#[should_panic(expected = "partition size must be positive")]
fn test_partition_zero_is_rejected() {
    let _ = Stream::of(vec![1]).partition(0);
}

#[test]
fn test_monad_absence_is_not_a_fault() {
    let absent = Monad::of(4).expect_pass(|x| *x > 10).map(|x| x * 2).val();
    assert!(!absent.is_present());
    assert!(absent.err().is_none());

    let faulted = Monad::of("4x")
        .try_map(|s| s.parse::<i32>().map_err(Error::transform))
        .map(|x| x * 2)
        .val();
    assert!(!faulted.is_present());
    assert!(matches!(faulted.err(), Some(Error::Transform(_))));
}

#[test]
fn test_branch_feeds_every_processor() {
    let totals = Rc::new(RefCell::new(Vec::new()));
    let sum = totals.clone();
    let max = totals.clone();

    let processors: Vec<StreamProcessor<i64>> = vec![
        Box::new(move |s| {
            let total = s.reduce(0, |acc, x| acc + x).into_inner().unwrap_or_default();
            sum.borrow_mut().push(total);
        }),
        Box::new(move |s| {
            let top = s.reduce0(|a, b| a.max(b)).into_inner().unwrap_or_default();
            max.borrow_mut().push(top);
        }),
    ];
    range(1, 5).branch(processors);

    assert_eq!(*totals.borrow(), vec![15, 5]);
}

#[test]
fn test_line_source_over_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "alpha").unwrap();
    writeln!(file, "   ").unwrap();
    writeln!(file, " beta ").unwrap();
    file.flush().unwrap();

    let reader = BufReader::new(File::open(file.path()).unwrap());
    let config = LineSourceConfig::default().trim(true).skip_empty(true);
    let mut lines = LineSource::with_config(reader, config).into_stream();

    assert_eq!(lines.error(), None);
    assert_eq!(lines.result(), vec!["alpha", "beta"]);
}

#[test]
fn test_tokio_channel_source() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (tx, rx) = tokio::sync::mpsc::channel(4);
    runtime.spawn(async move {
        for i in 0..6 {
            tx.send(i).await.unwrap();
        }
    });

    let evens = Stream::from_tokio_channel(rx).filter(|x| x % 2 == 0).result();
    assert_eq!(evens, vec![0, 2, 4]);
}

#[test]
fn test_async_interop() {
    let stream = Stream::from_async(futures::stream::iter(vec![1, 2, 3])).map(|x| x * 10);
    let collected: Vec<i32> = tokio_test::block_on(stream.into_async().collect());
    assert_eq!(collected, vec![10, 20, 30]);
}

#[test]
fn test_group_by() {
    let groups = Stream::of(vec!["apple", "avocado", "banana", "blueberry", "cherry"])
        .group_by(|s| s.chars().next().unwrap_or_default())
        .result();

    let expected = HashMap::from([
        ('a', vec!["apple", "avocado"]),
        ('b', vec!["banana", "blueberry"]),
        ('c', vec!["cherry"]),
    ]);
    assert_eq!(groups, expected);
}

#[test]
fn test_kv_stream_from_source() {
    let stock = MapSource::new(vec![("pen", 3), ("ink", 0), ("pad", 7)]).into_kv_stream();
    let mut available = stock.filter(|_, n| *n > 0).keys().result();
    available.sort();
    assert_eq!(available, vec!["pad", "pen"]);
}

#[test]
fn test_predicate_helpers() {
    let names = Stream::of(vec!["Ann", "", "ann", "Bob"])
        .reject(empty_string())
        .filter(equal_ignore_case("ANN"))
        .count();
    assert_eq!(names, 2);
}
