use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

/// The process-global metrics registry (§5: "a process-global labelled
/// gauge; updates are idempotent by design"). Exposed as collector-format
/// text at `/metrics`.
pub struct Metrics {
    registry: Registry,
    failed_deployment: GaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let failed_deployment = GaugeVec::new(
            Opts::new(
                "failed_deployment",
                "Number of consecutive failed rollout verifications for an application",
            ),
            &["app_name"],
        )
        .expect("static metric options are always valid");

        registry
            .register(Box::new(failed_deployment.clone()))
            .expect("failed_deployment is only registered once");

        Self {
            registry,
            failed_deployment,
        }
    }

    pub fn record_failed(&self, app: &str) {
        self.failed_deployment.with_label_values(&[app]).inc();
    }

    pub fn reset_failed(&self, app: &str) {
        self.failed_deployment.with_label_values(&[app]).set(0.0);
    }

    /// Renders every registered metric in Prometheus text exposition
    /// format.
    pub fn encode(&self) -> String {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .expect("encoding gathered metric families never fails");
        String::from_utf8(buf).expect("prometheus text output is always valid utf-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
