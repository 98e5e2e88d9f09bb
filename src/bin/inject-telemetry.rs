//! TICS telemetry injection utility
//!
//! Publishes one sample onto a telemetry topic, standing in for the ESP32 when
//! trying the monitor against a broker.
//!
//! ## Usage
//!
//! ```bash
//! # Trigger the smoke alarm
//! inject-telemetry --channel alarm --value 1
//!
//! # Move the bracelet out of range (about 2.5 m)
//! inject-telemetry --channel rssi --value -75
//!
//! # Malformed payload, decoded with the channel fallback
//! inject-telemetry --channel rssi --value abc
//!
//! # Private broker
//! inject-telemetry --broker mqtt://localhost:1883 --channel alarm --value 0
//! ```

use clap::{Parser, ValueEnum};
use rumqttc::v5::mqttbytes::v5::Packet;
use rumqttc::v5::mqttbytes::QoS;
use rumqttc::v5::{AsyncClient, Event, EventLoop};
use tics_monitor::config::{MqttSection, DEFAULT_BROKER_URL};
use tics_monitor::protocol::topics::{validate_topic, TelemetryChannel};
use tics_monitor::transport::mqtt::{configure_mqtt_options, generate_client_id};
use tokio::time::{timeout, Duration};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChannelArg {
    Alarm,
    Rssi,
    Bracelet,
}

impl From<ChannelArg> for TelemetryChannel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Alarm => TelemetryChannel::AlarmSmoke,
            ChannelArg::Rssi => TelemetryChannel::SignalStrength,
            ChannelArg::Bracelet => TelemetryChannel::BraceletNear,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "inject-telemetry",
    about = "Publish a test telemetry sample for the TICS monitor"
)]
struct Args {
    /// Telemetry channel to publish on
    #[arg(long, value_enum)]
    channel: ChannelArg,

    /// Raw payload, sent as-is
    #[arg(long, allow_hyphen_values = true)]
    value: String,

    /// Publish to this topic instead of the channel's default one
    #[arg(long)]
    topic: Option<String>,

    /// MQTT broker URL
    #[arg(long, env = "TICS_BROKER_URL", default_value = DEFAULT_BROKER_URL)]
    broker: String,

    /// Ask the broker to retain the sample
    #[arg(long)]
    retain: bool,

    /// Seconds to wait for the broker
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

struct TelemetryInjector {
    client: AsyncClient,
    event_loop: EventLoop,
}

impl TelemetryInjector {
    async fn connect(broker_url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config = MqttSection {
            broker_url: broker_url.to_string(),
            ..MqttSection::default()
        };
        let options = configure_mqtt_options(&generate_client_id("inject-telemetry"), &config)?;
        let (client, mut event_loop) = AsyncClient::new(options, 10);

        println!("Connecting to MQTT broker {broker_url}...");
        loop {
            if let Event::Incoming(Packet::ConnAck(_)) = event_loop.poll().await? {
                break;
            }
        }

        Ok(Self { client, event_loop })
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &str,
        retain: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.client
            .publish(topic, QoS::AtMostOnce, retain, payload.to_string())
            .await?;

        // QoS 0 is done once the publish has been written out
        loop {
            if let Event::Outgoing(_) = self.event_loop.poll().await? {
                break;
            }
        }

        self.client.disconnect().await?;
        while let Ok(event) = self.event_loop.poll().await {
            if let Event::Outgoing(_) = event {
                break;
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let channel = TelemetryChannel::from(args.channel);
    let topic = args
        .topic
        .unwrap_or_else(|| channel.default_topic().to_string());

    if let Err(e) = validate_topic(&topic) {
        eprintln!("✗ {e}");
        std::process::exit(1);
    }

    let wait = Duration::from_secs(args.timeout_secs);
    let result = timeout(wait, async {
        let mut injector = TelemetryInjector::connect(&args.broker).await?;
        injector.publish(&topic, &args.value, args.retain).await
    })
    .await;

    match result {
        Ok(Ok(())) => {
            println!("✓ Published {:?} to {topic} ({channel})", args.value);
            Ok(())
        }
        Ok(Err(e)) => {
            eprintln!("✗ Failed to publish sample: {e}");
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("✗ Timed out after {}s waiting for the broker", args.timeout_secs);
            std::process::exit(1);
        }
    }
}
