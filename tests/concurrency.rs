//! 调度与并发行为测试
//!
//! 防抖合并、重叠请求互不相交、请求挂起期间的新文本、重置后的过期结果

use std::rc::Rc;
use std::time::Duration;

use tokio::time::sleep;

use i18n_observer::dom::{find_nodes, get_node_text};
use i18n_observer::translation::{
    FnProvider, I18nObserver, ObserverOptions, TranslationError, TranslationMap, TranslationRequest,
};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{flush, run_local, tag, HtmlTestHelper, ManualProvider, RecordingProvider, WINDOW};

fn observer_with<P>(provider: P) -> I18nObserver
where
    P: i18n_observer::translation::TranslationProvider + 'static,
{
    let options = ObserverOptions::new(tag("en-US"), provider).with_target_language(tag("zh-CN"));
    I18nObserver::new(options).unwrap()
}

/// 窗口内的连续变更合并为一次请求
#[tokio::test(start_paused = true)]
async fn test_burst_of_mutations_is_one_request() {
    run_local(async {
        let document = HtmlTestHelper::document("");
        let provider = RecordingProvider::new(&[]);
        let observer = observer_with(Rc::clone(&provider));

        observer.observe(&document, None);
        let body = document.body();
        for i in 0..5 {
            let paragraph = HtmlTestHelper::element_with_text(&document, "p", &format!("Line {}", i));
            document.append_child(&body, &paragraph);
            sleep(WINDOW / 4).await;
        }
        assert_eq!(provider.call_count(), 0);

        observer.wait_idle().await;

        let expected: Vec<String> = (0..5).map(|i| format!("Line {}", i)).collect();
        assert_eq!(provider.requested_texts(), vec![expected]);
    })
    .await;
}

/// 前一次请求未返回时发起的请求不包含在途文本，挂起期间新发现的文本进入下一次请求
#[tokio::test(start_paused = true)]
async fn test_overlapping_requests_are_disjoint() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>One</p>");
        let provider = ManualProvider::new();
        let observer = observer_with(Rc::clone(&provider));

        observer.observe(&document, None);
        sleep(WINDOW * 2).await;
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.request(0).text, vec!["One"]);
        assert_eq!(observer.in_flight_texts(), vec!["One"]);

        // 第一次请求挂起期间插入新节点
        let body = document.body();
        let again = HtmlTestHelper::element_with_text(&document, "p", "One");
        let two = HtmlTestHelper::element_with_text(&document, "p", "Two");
        document.batch(|tx| {
            tx.append_child(&body, &again);
            tx.append_child(&body, &two);
        });
        flush().await;
        assert_eq!(observer.pending_len(), 2);
        assert_eq!(provider.call_count(), 1);

        sleep(WINDOW * 2).await;
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.request(1).text, vec!["Two"]);
        assert_eq!(provider.outstanding(), 2);
        assert_eq!(observer.in_flight_texts(), vec!["One", "Two"]);

        provider.respond(1, &[("Two", "二")]);
        flush().await;
        provider.respond(0, &[("One", "一")]);
        observer.wait_idle().await;

        assert_eq!(HtmlTestHelper::texts(&body), vec!["一", "一", "二"]);
        assert!(observer.in_flight_texts().is_empty());
        assert_eq!(observer.awaiting_len(), 0);
    })
    .await;
}

/// 翻译返回前节点文本被改写：写回按当前文本决定
#[tokio::test(start_paused = true)]
async fn test_write_back_rereads_current_text() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>Bye</p>");
        let provider = ManualProvider::new();
        let observer = observer_with(Rc::clone(&provider));

        observer.observe(&document, None);
        sleep(WINDOW * 2).await;
        assert_eq!(provider.call_count(), 1);

        let paragraph = find_nodes(document.document(), &["p"]).remove(0);
        let text = HtmlTestHelper::first_text(&paragraph);
        document.set_text(&text, "Welcome");
        flush().await;

        provider.respond(0, &[("Bye", "再见")]);
        flush().await;
        // 当前文本没有译文，节点保持不变并继续等待
        assert_eq!(get_node_text(&text).as_deref(), Some("Welcome"));
        assert_eq!(observer.translation("Bye").as_deref(), Some("再见"));

        sleep(WINDOW * 2).await;
        assert_eq!(provider.request(1).text, vec!["Welcome"]);
        provider.respond(1, &[("Welcome", "欢迎")]);
        observer.wait_idle().await;

        assert_eq!(get_node_text(&text).as_deref(), Some("欢迎"));
        assert_eq!(observer.awaiting_len(), 0);
    })
    .await;
}

/// 请求返回前节点被移除，写回不会出错
#[tokio::test(start_paused = true)]
async fn test_removed_node_is_tolerated() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>Bye</p><p>Stay</p>");
        let provider = ManualProvider::new();
        let observer = observer_with(Rc::clone(&provider));

        observer.observe(&document, None);
        sleep(WINDOW * 2).await;

        let body = document.body();
        let removed = find_nodes(document.document(), &["p"]).remove(0);
        assert!(document.remove_child(&body, &removed));

        provider.respond(0, &[("Bye", "再见"), ("Stay", "留下")]);
        observer.wait_idle().await;

        assert_eq!(HtmlTestHelper::texts(&body), vec!["留下"]);
        assert_eq!(observer.dictionary_len(), 2);
        assert_eq!(observer.awaiting_len(), 0);
    })
    .await;
}

/// 已经是译文的文本不会被再次送去翻译
#[tokio::test(start_paused = true)]
async fn test_translation_output_is_never_requested() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>Hello</p>");
        let provider = RecordingProvider::new(&[("Hello", "你好")]);
        let observer = observer_with(Rc::clone(&provider));

        observer.observe(&document, None);
        observer.wait_idle().await;

        let paragraph = HtmlTestHelper::element_with_text(&document, "p", "你好");
        document.append_child(&document.body(), &paragraph);
        observer.wait_idle().await;

        assert_eq!(provider.call_count(), 1);
        assert_eq!(observer.pending_len(), 0);
    })
    .await;
}

/// 原地重置：旧语言的结果作废，文本还原后按新语言重新翻译
#[tokio::test(start_paused = true)]
async fn test_reset_discards_stale_results_and_retranslates() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>One</p>");
        let provider = ManualProvider::new();
        let observer = observer_with(Rc::clone(&provider));

        observer.observe(&document, None);
        sleep(WINDOW * 2).await;
        assert_eq!(provider.call_count(), 1);

        assert!(observer.set_target_language(tag("ja")).unwrap());
        assert!(observer.in_flight_texts().is_empty());

        // 旧请求在重置之后才返回
        provider.respond(0, &[("One", "一")]);
        flush().await;
        let body = document.body();
        assert_eq!(HtmlTestHelper::texts(&body), vec!["One"]);
        assert_eq!(observer.stats().stale_batches, 1);
        assert_eq!(observer.dictionary_len(), 0);

        sleep(WINDOW * 2).await;
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.request(1).target_language.as_str(), "ja");
        assert_eq!(provider.request(1).text, vec!["One"]);

        provider.respond(1, &[("One", "ワン")]);
        observer.wait_idle().await;
        assert_eq!(HtmlTestHelper::texts(&body), vec!["ワン"]);
    })
    .await;
}

/// 重置会先把已写入的译文还原为原文
#[tokio::test(start_paused = true)]
async fn test_reset_restores_source_text() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>Hello</p>");
        let provider = FnProvider::new(|request: TranslationRequest| async move {
            Ok::<_, TranslationError>(
                request
                    .text
                    .iter()
                    .map(|text| (text.clone(), format!("[{}] {}", request.target_language, text)))
                    .collect::<TranslationMap>(),
            )
        });
        let observer = observer_with(provider);

        observer.observe(&document, None);
        observer.wait_idle().await;
        assert_eq!(HtmlTestHelper::texts(&document.body()), vec!["[zh-CN] Hello"]);

        observer.set_target_language(tag("ja")).unwrap();
        assert_eq!(HtmlTestHelper::texts(&document.body()), vec!["Hello"]);

        observer.wait_idle().await;
        assert_eq!(HtmlTestHelper::texts(&document.body()), vec!["[ja] Hello"]);
        assert_eq!(observer.stats().resets, 1);
    })
    .await;
}

/// 多条原文共用一条译文时，各节点还原为各自的原文
#[tokio::test(start_paused = true)]
async fn test_reset_restores_each_node_to_its_own_source() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>Hi</p><p>Hey</p>");
        let provider = RecordingProvider::new(&[("Hi", "嗨"), ("Hey", "嗨")]);
        let observer = observer_with(Rc::clone(&provider));

        observer.observe(&document, None);
        observer.wait_idle().await;
        let body = document.body();
        assert_eq!(HtmlTestHelper::texts(&body), vec!["嗨", "嗨"]);

        observer.set_target_language(tag("ja")).unwrap();
        assert_eq!(HtmlTestHelper::texts(&body), vec!["Hi", "Hey"]);

        observer.wait_idle().await;
        assert_eq!(provider.requested_texts()[1], vec!["Hi", "Hey"]);
    })
    .await;
}

/// 作者写下的、恰好与某条译文相同的文本在重置时保持不变
#[tokio::test(start_paused = true)]
async fn test_reset_keeps_authored_text_matching_a_translation() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>Hello</p>");
        let provider = RecordingProvider::new(&[("Hello", "你好")]);
        let observer = observer_with(Rc::clone(&provider));

        observer.observe(&document, None);
        observer.wait_idle().await;

        let authored = HtmlTestHelper::element_with_text(&document, "p", "你好");
        document.append_child(&document.body(), &authored);
        observer.wait_idle().await;
        assert_eq!(provider.call_count(), 1);

        observer.set_target_language(tag("ja")).unwrap();
        assert_eq!(HtmlTestHelper::texts(&document.body()), vec!["Hello", "你好"]);
    })
    .await;
}

/// 目标语言不变的重置不会重复请求仍在途的原文
#[tokio::test(start_paused = true)]
async fn test_reset_with_same_language_waits_for_outstanding_call() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>One</p>");
        let provider = ManualProvider::new();
        let observer = observer_with(Rc::clone(&provider));

        observer.observe(&document, None);
        sleep(WINDOW * 2).await;
        assert_eq!(provider.call_count(), 1);

        observer.reset();
        assert_eq!(observer.in_flight_texts(), vec!["One"]);

        sleep(WINDOW * 2).await;
        assert_eq!(provider.call_count(), 1);
        assert_eq!(observer.awaiting_len(), 1);

        provider.respond(0, &[("One", "一")]);
        observer.wait_idle().await;

        assert_eq!(HtmlTestHelper::texts(&document.body()), vec!["一"]);
        assert!(observer.in_flight_texts().is_empty());
        assert_eq!(observer.stats().stale_batches, 0);
        assert_eq!(observer.stats().resets, 1);
    })
    .await;
}

/// 重复调用 observe 会替换之前的监听目标
#[tokio::test(start_paused = true)]
async fn test_observe_again_replaces_target() {
    run_local(async {
        let document = HtmlTestHelper::document("<div id='a'></div><div id='b'></div>");
        let provider = RecordingProvider::new(&[]);
        let observer = observer_with(Rc::clone(&provider));

        let divs = find_nodes(document.document(), &["div"]);
        observer.observe(&document, None);
        observer.observe(&document, Some(divs[1].clone()));
        flush().await;
        assert_eq!(document.subscriber_count(), 1);

        let outside = HtmlTestHelper::element_with_text(&document, "p", "Outside");
        document.append_child(&divs[0], &outside);
        let inside = HtmlTestHelper::element_with_text(&document, "p", "Inside");
        document.append_child(&divs[1], &inside);
        observer.wait_idle().await;

        assert_eq!(provider.requested_texts(), vec![vec!["Inside".to_string()]]);
    })
    .await;
}

/// 观察者被丢弃后停止监听
#[tokio::test(start_paused = true)]
async fn test_dropping_observer_stops_watching() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>Hello</p>");
        let provider = RecordingProvider::new(&[]);
        let observer = observer_with(Rc::clone(&provider));

        observer.observe(&document, None);
        assert!(observer.is_observing());
        drop(observer);
        flush().await;
        assert_eq!(document.subscriber_count(), 0);

        sleep(WINDOW * 2).await;
        assert_eq!(provider.call_count(), 0);
    })
    .await;
}

/// 请求耗时超过防抖窗口时仍然能等到全部完成
#[tokio::test(start_paused = true)]
async fn test_wait_idle_covers_slow_provider() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>Slow</p>");
        let provider = RecordingProvider::new(&[("Slow", "慢")]);
        provider.set_delay(Duration::from_secs(5));
        let observer = observer_with(Rc::clone(&provider));

        observer.observe(&document, None);
        observer.wait_idle().await;

        assert_eq!(HtmlTestHelper::texts(&document.body()), vec!["慢"]);
    })
    .await;
}

/// 宿主直接发起的批次同样计入 wait_idle
#[tokio::test(start_paused = true)]
async fn test_wait_idle_covers_direct_translate_pending() {
    run_local(async {
        let document = HtmlTestHelper::document("<p>Slow</p>");
        let provider = RecordingProvider::new(&[("Slow", "慢")]);
        provider.set_delay(Duration::from_secs(5));
        let observer = observer_with(Rc::clone(&provider));

        observer.add_text_nodes(&[document.body()]);
        let direct = observer.clone();
        let task = tokio::task::spawn_local(async move { direct.translate_pending().await });
        flush().await;
        assert_eq!(provider.call_count(), 1);

        observer.wait_idle().await;
        assert_eq!(HtmlTestHelper::texts(&document.body()), vec!["慢"]);

        let report = task.await.unwrap().unwrap();
        assert_eq!(report.applied, 1);
    })
    .await;
}
