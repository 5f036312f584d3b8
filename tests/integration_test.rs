use ramu::assistant::{Assistant, CycleOutcome, MSG_CRITICAL, MSG_GREETING};
use ramu::backends::{ListenWindow, SpeechRecognizer};
use ramu::commands::Intent;
use ramu::config_loader::Settings;
use ramu::ear::{normalize, Ear, MSG_UNINTELLIGIBLE};
use ramu::engine::AudioOutput;
use ramu::error::{CaptureError, LookupError, MailError, MediaError, SpeechError, WeatherError};
use ramu::handlers::{self, Collaborators, Dispatched, Dispatcher};
use ramu::services::jokes::JokeSource;
use ramu::services::mail::{Email, Mailer};
use ramu::services::media::MediaPlayer;
use ramu::services::todo::TodoStore;
use ramu::services::weather::{CurrentWeather, WeatherProvider};
use ramu::services::wikipedia::Encyclopedia;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mockall::mock! {
    pub Output {}
    #[async_trait::async_trait]
    impl AudioOutput for Output {
        async fn speak(&self, text: &str) -> Result<(), SpeechError>;
    }
}

mockall::mock! {
    pub Recognizer {}
    #[async_trait::async_trait]
    impl SpeechRecognizer for Recognizer {
        async fn recognize(&self, window: ListenWindow) -> Result<String, CaptureError>;
    }
}

mockall::mock! {
    pub Weather {}
    #[async_trait::async_trait]
    impl WeatherProvider for Weather {
        async fn current(&self, city: &str, api_key: &str) -> Result<CurrentWeather, WeatherError>;
    }
}

mockall::mock! {
    pub Encyclopedia {}
    #[async_trait::async_trait]
    impl Encyclopedia for Encyclopedia {
        async fn summary(&self, subject: &str) -> Result<String, LookupError>;
    }
}

mockall::mock! {
    pub Media {}
    #[async_trait::async_trait]
    impl MediaPlayer for Media {
        async fn play(&self, query: &str) -> Result<(), MediaError>;
    }
}

mockall::mock! {
    pub Jokes {}
    impl JokeSource for Jokes {
        fn joke(&self) -> String;
    }
}

mockall::mock! {
    pub Mailer {}
    #[async_trait::async_trait]
    impl Mailer for Mailer {
        async fn send(&self, email: &Email) -> Result<(), MailError>;
    }
}

mockall::mock! {
    pub Todo {}
    impl TodoStore for Todo {
        fn append(&self, item: &str) -> io::Result<()>;
        fn load(&self) -> io::Result<Option<Vec<String>>>;
    }
}

const COMMANDS: &str = r#""commands": {
    "play": "play", "time": "time", "who_the_heck_is": "who the heck is",
    "date": "date", "are_you_single": "are you single", "joke": "joke",
    "add_to_do": "add to do", "list_to_do": "list to do", "weather": "weather in",
    "send_email": "send email", "set_reminder": "remind me", "smart_home": "turn on"
}"#;

/// Collaborators with no expectations: any call fails the test.
struct Rig {
    extra_config: &'static str,
    answers: Vec<Result<String, CaptureError>>,
    weather: MockWeather,
    encyclopedia: MockEncyclopedia,
    media: MockMedia,
    jokes: Arc<dyn JokeSource>,
    mailer: MockMailer,
    todo: MockTodo,
}

struct Running {
    spoken: Arc<Mutex<Vec<String>>>,
    ear: Arc<Ear>,
    output: Arc<dyn AudioOutput>,
    dispatcher: Dispatcher,
}

impl Rig {
    fn new() -> Self {
        Self {
            extra_config: "",
            answers: Vec::new(),
            weather: MockWeather::new(),
            encyclopedia: MockEncyclopedia::new(),
            media: MockMedia::new(),
            jokes: Arc::new(MockJokes::new()),
            mailer: MockMailer::new(),
            todo: MockTodo::new(),
        }
    }

    fn hearing(mut self, answers: &[&str]) -> Self {
        self.answers = answers.iter().map(|a| Ok(a.to_string())).collect();
        self
    }

    fn start(self) -> Running {
        let json = format!("{{ {}{} }}", COMMANDS, self.extra_config);
        let settings = Arc::new(Settings::from_json_str(&json).expect("test config"));

        let spoken = Arc::new(Mutex::new(Vec::new()));
        let log = spoken.clone();
        let mut output = MockOutput::new();
        output.expect_speak().returning(move |text| {
            log.lock().unwrap().push(text.to_string());
            Ok(())
        });
        let output: Arc<dyn AudioOutput> = Arc::new(output);

        let queue = Arc::new(Mutex::new(VecDeque::from(self.answers)));
        let mut recognizer = MockRecognizer::new();
        recognizer.expect_recognize().returning(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CaptureError::Unintelligible))
        });

        let window = ListenWindow {
            timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(5),
        };
        let ear = Arc::new(Ear::new(
            Arc::new(recognizer),
            output.clone(),
            &settings.wake_word,
            window,
        ));

        let services = Collaborators {
            output: output.clone(),
            weather: Arc::new(self.weather),
            encyclopedia: Arc::new(self.encyclopedia),
            media: Arc::new(self.media),
            jokes: self.jokes,
            mailer: Arc::new(self.mailer),
            todo: Arc::new(self.todo),
        };
        let dispatcher = Dispatcher::new(settings, ear.clone(), services);
        Running {
            spoken,
            ear,
            output,
            dispatcher,
        }
    }
}

impl Running {
    async fn say(&self, command: &str) -> Dispatched {
        self.dispatcher
            .dispatch(&normalize(command, "ramu"))
            .await
            .expect("dispatch")
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn test_empty_utterance_is_skipped_silently() {
    let rig = Rig::new().start();
    assert_eq!(rig.say("Ramu").await, Dispatched::Skipped);
    assert!(rig.spoken().is_empty());
}

#[tokio::test]
async fn test_unmatched_utterance_falls_back_once() {
    let rig = Rig::new().start();
    assert_eq!(rig.say("ramu sing me a song").await, Dispatched::Fallback);
    assert_eq!(rig.spoken(), vec![handlers::MSG_FALLBACK.to_string()]);
}

#[tokio::test]
async fn test_earlier_trigger_wins() {
    let rig = Rig::new().start();
    // "time" precedes "date" in the table
    assert_eq!(
        rig.say("what date and time is it").await,
        Dispatched::Handled(Intent::Time)
    );
    assert!(rig.spoken()[0].starts_with("The current time is "));
}

#[tokio::test]
async fn test_fixed_replies() {
    let rig = Rig::new().start();
    rig.say("what is the date").await;
    rig.say("are you single").await;
    rig.say("turn on the lights").await;
    assert_eq!(
        rig.spoken(),
        vec![
            handlers::MSG_DATE.to_string(),
            handlers::MSG_RELATIONSHIP.to_string(),
            handlers::MSG_SMART_HOME.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_play_media_announces_then_plays() {
    let mut rig = Rig::new();
    rig.media
        .expect_play()
        .withf(|query| query == "despacito")
        .times(1)
        .returning(|_| Ok(()));
    let rig = rig.start();

    assert_eq!(
        rig.say("Ramu play despacito").await,
        Dispatched::Handled(Intent::PlayMedia)
    );
    assert_eq!(rig.spoken(), vec!["Playing despacito on YouTube.".to_string()]);
}

#[tokio::test]
async fn test_play_media_failure_is_spoken() {
    let mut rig = Rig::new();
    rig.media
        .expect_play()
        .returning(|q| Err(MediaError::NotFound(q.to_string())));
    let rig = rig.start();

    rig.say("play nothing at all").await;
    assert_eq!(
        rig.spoken()[1],
        "Sorry, I couldn't start playback for nothing at all."
    );
}

#[tokio::test]
async fn test_lookup_person_outcomes() {
    let mut rig = Rig::new();
    rig.encyclopedia
        .expect_summary()
        .returning(|subject| match subject {
            "ada lovelace" => Ok("Ada Lovelace was an English mathematician.".to_string()),
            "mercury" => Err(LookupError::Ambiguous {
                subject: subject.to_string(),
                options: vec![
                    "Mercury (planet)".to_string(),
                    "Mercury (element)".to_string(),
                    "Freddie Mercury".to_string(),
                    "Mercury (mythology)".to_string(),
                ],
            }),
            "nobody" => Err(LookupError::NotFound(subject.to_string())),
            _ => Err(LookupError::Transport("offline".to_string())),
        });
    let rig = rig.start();

    rig.say("who the heck is ada lovelace").await;
    rig.say("who the heck is mercury").await;
    rig.say("who the heck is nobody").await;
    rig.say("who the heck is anyone").await;
    assert_eq!(
        rig.spoken(),
        vec![
            "Ada Lovelace was an English mathematician.".to_string(),
            "There are multiple results. Could you be more specific? For example: \
             Mercury (planet), Mercury (element), Freddie Mercury"
                .to_string(),
            handlers::MSG_PERSON_NOT_FOUND.to_string(),
            handlers::MSG_ENCYCLOPEDIA_DOWN.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_joke_comes_from_collaborator() {
    let mut rig = Rig::new();
    let mut jokes = MockJokes::new();
    jokes
        .expect_joke()
        .times(1)
        .returning(|| "Knock knock.".to_string());
    rig.jokes = Arc::new(jokes);
    let rig = rig.start();

    rig.say("tell me a joke").await;
    assert_eq!(rig.spoken(), vec!["Knock knock.".to_string()]);
}

#[tokio::test]
async fn test_add_todo_appends_payload() {
    let mut rig = Rig::new();
    rig.todo
        .expect_append()
        .withf(|item| item == "buy milk")
        .times(1)
        .returning(|_| Ok(()));
    let rig = rig.start();

    rig.say("add to do buy milk").await;
    assert_eq!(
        rig.spoken(),
        vec!["Added \"buy milk\" to your to-do list.".to_string()]
    );
}

#[tokio::test]
async fn test_list_todo_without_storage() {
    let mut rig = Rig::new();
    rig.todo.expect_load().returning(|| Ok(None));
    let rig = rig.start();

    rig.say("list to do").await;
    assert_eq!(rig.spoken(), vec![handlers::MSG_TODO_MISSING.to_string()]);
}

#[tokio::test]
async fn test_list_todo_with_blank_storage() {
    let mut rig = Rig::new();
    rig.todo.expect_load().returning(|| Ok(Some(Vec::new())));
    let rig = rig.start();

    rig.say("list to do").await;
    assert_eq!(rig.spoken(), vec![handlers::MSG_TODO_EMPTY.to_string()]);
}

#[tokio::test]
async fn test_list_todo_numbers_items_in_order() {
    let mut rig = Rig::new();
    rig.todo.expect_load().returning(|| {
        Ok(Some(vec![
            "buy milk".to_string(),
            "call the bank".to_string(),
            "water plants".to_string(),
        ]))
    });
    let rig = rig.start();

    rig.say("list to do").await;
    assert_eq!(
        rig.spoken(),
        vec![
            handlers::MSG_TODO_HEADER.to_string(),
            "Item 1: buy milk".to_string(),
            "Item 2: call the bank".to_string(),
            "Item 3: water plants".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_weather_without_city_skips_provider() {
    let mut rig = Rig::new();
    rig.extra_config = r#", "weather_api_key": "abc123""#;
    rig.weather.expect_current().never();
    let rig = rig.start();

    assert_eq!(rig.say("weather in").await, Dispatched::Handled(Intent::Weather));
    assert_eq!(rig.spoken(), vec![handlers::MSG_WEATHER_NO_CITY.to_string()]);
}

#[tokio::test]
async fn test_weather_placeholder_key_skips_provider() {
    let mut rig = Rig::new();
    rig.extra_config = r#", "weather_api_key": "YOUR_API_KEY""#;
    rig.weather.expect_current().never();
    let rig = rig.start();

    rig.say("weather in paris").await;
    assert_eq!(rig.spoken(), vec![handlers::MSG_WEATHER_NO_KEY.to_string()]);
}

#[tokio::test]
async fn test_weather_report_and_failures() {
    let mut rig = Rig::new();
    rig.extra_config = r#", "weather_api_key": "abc123""#;
    rig.weather
        .expect_current()
        .withf(|_, key| key == "abc123")
        .returning(|city, _| match city {
            "paris" => Ok(CurrentWeather {
                temp_c: 21.5,
                condition: "Sunny".to_string(),
            }),
            "atlantis" => Err(WeatherError::Malformed("missing 'temp_c'".to_string())),
            _ => Err(WeatherError::Transport("connection refused".to_string())),
        });
    let rig = rig.start();

    rig.say("weather in paris").await;
    rig.say("weather in atlantis").await;
    rig.say("weather in london").await;
    assert_eq!(
        rig.spoken(),
        vec![
            "The weather in paris is Sunny with a temperature of 21.5 degrees Celsius."
                .to_string(),
            "Could not parse the weather data for atlantis. Please check the city name."
                .to_string(),
            "Sorry, I could not get the weather information for london.".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_email_flow_sends_collected_fields() {
    let mut rig = Rig::new().hearing(&["bob at example dot com", "Lunch", "See you at noon"]);
    rig.extra_config = r#", "email_address": "me@example.com", "email_password": "pw""#;
    rig.mailer
        .expect_send()
        .withf(|email| {
            email.to == "bob at example dot com"
                && email.subject == "lunch"
                && email.body == "see you at noon"
        })
        .times(1)
        .returning(|_| Ok(()));
    let rig = rig.start();

    assert_eq!(
        rig.say("send email").await,
        Dispatched::Handled(Intent::SendEmail)
    );
    assert_eq!(
        rig.spoken(),
        vec![
            "Who is the recipient?".to_string(),
            "What is the subject of the email?".to_string(),
            "And what is the message?".to_string(),
            handlers::MSG_EMAIL_SENT.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_email_without_credentials_never_sends() {
    let mut rig = Rig::new().hearing(&["bob@example.com", "hi", "hello"]);
    rig.mailer.expect_send().never();
    let rig = rig.start();

    rig.say("send email").await;
    assert_eq!(
        rig.spoken().last().unwrap(),
        handlers::MSG_EMAIL_NO_CREDENTIALS
    );
}

#[tokio::test]
async fn test_email_failures_are_classified() {
    let mut rig = Rig::new().hearing(&[
        "a@example.com", "one", "first",
        "b@example.com", "two", "second",
        "nobody", "three", "third",
    ]);
    rig.extra_config = r#", "email_address": "me@example.com", "email_password": "pw""#;
    rig.mailer.expect_send().returning(|email| match email.to.as_str() {
        "a@example.com" => Err(MailError::Authentication("535".to_string())),
        "b@example.com" => Err(MailError::Transport("timeout".to_string())),
        other => Err(MailError::InvalidAddress(other.to_string())),
    });
    let rig = rig.start();

    rig.say("send email").await;
    rig.say("send email").await;
    rig.say("send email").await;
    let spoken = rig.spoken();
    assert_eq!(spoken[3], handlers::MSG_EMAIL_AUTH);
    assert_eq!(spoken[7], handlers::MSG_EMAIL_FAILED);
    assert_eq!(spoken[11], handlers::MSG_EMAIL_BAD_ADDRESS);
}

#[tokio::test]
async fn test_email_passes_empty_answers_through() {
    let mut rig = Rig::new();
    rig.answers = vec![
        Ok("bob@example.com".to_string()),
        Err(CaptureError::Unintelligible),
        Ok("hello".to_string()),
    ];
    rig.extra_config = r#", "email_address": "me@example.com", "email_password": "pw""#;
    rig.mailer
        .expect_send()
        .withf(|email| email.subject.is_empty() && email.body == "hello")
        .times(1)
        .returning(|_| Ok(()));
    let rig = rig.start();

    rig.say("send email").await;
    assert_eq!(
        rig.spoken(),
        vec![
            "Who is the recipient?".to_string(),
            "What is the subject of the email?".to_string(),
            MSG_UNINTELLIGIBLE.to_string(),
            "And what is the message?".to_string(),
            handlers::MSG_EMAIL_SENT.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_reminder_with_bad_minutes_schedules_nothing() {
    let rig = Rig::new().hearing(&["call mom", "abc"]).start();

    rig.say("remind me").await;
    assert_eq!(rig.dispatcher.reminders().scheduled_count(), 0);
    assert_eq!(
        rig.spoken(),
        vec![
            "What should I remind you about?".to_string(),
            "In how many minutes?".to_string(),
            handlers::MSG_REMINDER_BAD_TIME.to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reminder_schedules_one_task_and_fires() {
    let rig = Rig::new().hearing(&["call mom", "5"]).start();

    assert_eq!(
        rig.say("ramu remind me").await,
        Dispatched::Handled(Intent::SetReminder)
    );
    assert_eq!(rig.dispatcher.reminders().scheduled_count(), 1);
    assert_eq!(
        rig.spoken().last().unwrap(),
        "Okay, I'll remind you about call mom in 5 minutes."
    );

    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
    assert_eq!(rig.spoken().last().unwrap(), "Reminder: call mom");
}

struct PanickingJokes;

impl JokeSource for PanickingJokes {
    fn joke(&self) -> String {
        panic!("joke generator exploded");
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_recovers_from_handler_error() {
    let mut rig = Rig::new().hearing(&["add to do buy milk", "are you single"]);
    rig.todo
        .expect_append()
        .times(1)
        .returning(|_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only")));
    let running = rig.start();
    let spoken = running.spoken.clone();
    let assistant = Assistant::new(
        running.ear,
        running.dispatcher,
        running.output,
        Duration::from_secs(1),
    );

    assert_eq!(assistant.run_cycle().await, CycleOutcome::Recovered);
    assert_eq!(
        assistant.run_cycle().await,
        CycleOutcome::Completed(Dispatched::Handled(Intent::RelationshipStatus))
    );
    assert_eq!(
        *spoken.lock().unwrap(),
        vec![MSG_CRITICAL.to_string(), handlers::MSG_RELATIONSHIP.to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_recovers_from_panic() {
    let mut rig = Rig::new().hearing(&["tell me a joke", "what is the date"]);
    rig.jokes = Arc::new(PanickingJokes);
    let running = rig.start();
    let spoken = running.spoken.clone();
    let assistant = Assistant::new(
        running.ear,
        running.dispatcher,
        running.output,
        Duration::from_secs(1),
    );

    assistant.greet().await;
    assert_eq!(assistant.run_cycle().await, CycleOutcome::Recovered);
    assert_eq!(
        assistant.run_cycle().await,
        CycleOutcome::Completed(Dispatched::Handled(Intent::Date))
    );
    assert_eq!(
        *spoken.lock().unwrap(),
        vec![
            MSG_GREETING.to_string(),
            MSG_CRITICAL.to_string(),
            handlers::MSG_DATE.to_string()
        ]
    );
}

#[tokio::test]
async fn test_capture_failures_apologise_once() {
    let mut rig = Rig::new();
    rig.answers = vec![
        Err(CaptureError::Unintelligible),
        Err(CaptureError::ServiceUnavailable("model missing".to_string())),
        Err(CaptureError::Other("listening timed out".to_string())),
    ];
    let running = rig.start();

    for _ in 0..3 {
        assert!(running.ear.capture().await.is_empty());
    }
    assert_eq!(
        running.spoken(),
        vec![
            MSG_UNINTELLIGIBLE.to_string(),
            ramu::ear::MSG_SERVICE_UNAVAILABLE.to_string(),
            ramu::ear::MSG_CAPTURE_FAILED.to_string(),
        ]
    );
}
