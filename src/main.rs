use mq_consumer::{ConsumerConfig, Destination, MemoryFeed, Message};

#[tokio::main]
async fn main() {
    let feed = std::sync::Arc::new(MemoryFeed::new());
    let orders = Destination::queue("orders");
    let consumer = std::sync::Arc::new(feed.subscribe(orders.clone(), ConsumerConfig::default().with_label("demo")));

    for i in 0..4u8 {
        feed.publish(&orders, Message::bytes(vec![i]).with_property("seq", i.to_string())).unwrap();
    }

    // Messages come out in the order they were published, whatever the receive variant.
    let first = consumer.receive_no_wait().unwrap().unwrap();
    assert_eq!(first.property("seq"), Some("0"));
    assert_eq!(consumer.receive(100).await.unwrap().unwrap().property("seq"), Some("1"));
    assert_eq!(consumer.receive_bytes_body_no_wait().unwrap().as_deref(), Some(&[2u8][..]));
    assert_eq!(consumer.receive_bytes_body(0).await.unwrap().as_deref(), Some(&[3u8][..]));

    // Nothing left: timed receives give up without an error.
    assert!(consumer.receive(50).await.unwrap().is_none());

    // Closing from another task wakes up a receive that would otherwise wait forever.
    let waiter = tokio::spawn({
        let consumer = std::sync::Arc::clone(&consumer);
        async move { consumer.receive(0).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    consumer.close();

    println!("{:?}", waiter.await.unwrap());
}
