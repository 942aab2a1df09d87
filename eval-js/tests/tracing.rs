use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;

use eval_js::{Evaluator, Value};

#[derive(Clone, Default)]
struct SharedWriter {
  buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
  fn contents(&self) -> String {
    String::from_utf8(self.buffer.lock().unwrap().clone()).unwrap()
  }
}

struct SharedWriterGuard<'a> {
  buffer: &'a Arc<Mutex<Vec<u8>>>,
}

impl io::Write for SharedWriterGuard<'_> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.buffer.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> MakeWriter<'a> for SharedWriter {
  type Writer = SharedWriterGuard<'a>;

  fn make_writer(&'a self) -> Self::Writer {
    SharedWriterGuard {
      buffer: &self.buffer,
    }
  }
}

#[test]
fn tracing_reports_resolution_and_evaluation_spans() {
  let writer = SharedWriter::default();
  let subscriber = tracing_subscriber::fmt()
    .with_span_events(FmtSpan::CLOSE)
    .with_max_level(tracing::Level::TRACE)
    .with_ansi(false)
    .with_writer(writer.clone())
    .finish();

  tracing::subscriber::with_default(subscriber, || {
    Evaluator::default()
      .evaluate(|scope| {
        scope.call("missing", &[])?;
        scope.assign("created", Value::from(1));
        let f = scope.function(&[], |_scope, _args| Ok(Value::Undefined));
        scope.declare("f", Value::Function(f));
        scope.call("f", &[])
      })
      .unwrap();
  });

  let output = writer.contents();
  assert!(
    output.contains("unresolved name deferred"),
    "expected deferred identifier event, got: {output}"
  );
  assert!(
    output.contains("assignment to global object"),
    "expected global write event, got: {output}"
  );
  assert!(
    output.contains("resolved to function"),
    "expected resolution event, got: {output}"
  );
  assert!(
    output.contains("evaluate_with_args"),
    "expected evaluation span, got: {output}"
  );
}
