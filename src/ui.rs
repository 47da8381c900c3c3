use crate::export::EXPORT_FILE_NAME;
use uuid::Uuid;

pub fn render_index(session_id: Uuid) -> String {
    INDEX_HTML
        .replace("{{SESSION_ID}}", &session_id.to_string())
        .replace("{{EXPORT_FILE}}", EXPORT_FILE_NAME)
}

pub const COUNTER_PATH: &str = "/timed-counter.html";

pub fn render_launcher() -> String {
    LAUNCHER_HTML.replace("{{COUNTER_PATH}}", COUNTER_PATH)
}

const LAUNCHER_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Select Tool</title>
  <style>
    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(135deg, #eef7f6, #dff5f1 60%, #f4fbfa 100%);
      color: #1f2a2e;
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 24px;
    }

    .tools {
      display: flex;
      flex-direction: row;
      gap: 12px;
    }

    .button {
      display: inline-flex;
      align-items: center;
      min-width: max-content;
      height: 48pt;
      padding: 0 20px;
      border-radius: 14px;
      color: #fff;
      font-weight: 600;
      text-decoration: none;
      background: no-repeat padding-box linear-gradient(#22e6d3, #0092aa);
    }
  </style>
</head>
<body>
  <h1>Select Tool</h1>
  <div class="tools">
    <a class="button" href="{{COUNTER_PATH}}">Timed Counter</a>
  </div>
</body>
</html>
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Timed Counter</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #eef7f6;
      --bg-2: #b8ece5;
      --ink: #1f2a2e;
      --accent: #0092aa;
      --accent-2: #2f4858;
      --danger: #c63b2b;
      --card: rgba(255, 255, 255, 0.88);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #dff5f1 60%, #f4fbfa 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 24px 14px 40px;
    }

    .app {
      width: min(900px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 28px;
      display: grid;
      gap: 22px;
    }

    header {
      display: flex;
      flex-wrap: wrap;
      align-items: baseline;
      justify-content: space-between;
      gap: 12px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(1.8rem, 4vw, 2.4rem);
      margin: 0;
    }

    h2 {
      margin: 0 0 10px;
      font-size: 1.1rem;
    }

    .clock {
      font-size: 1.6rem;
      font-weight: 600;
      color: var(--accent-2);
      font-variant-numeric: tabular-nums;
    }

    .card {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
    }

    .row {
      display: flex;
      flex-wrap: wrap;
      gap: 10px;
      align-items: center;
    }

    input, textarea {
      font: inherit;
      padding: 10px 12px;
      border-radius: 12px;
      border: 1px solid rgba(47, 72, 88, 0.2);
    }

    textarea {
      width: 100%;
      min-height: 64px;
      resize: vertical;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 12px 18px;
      font-size: 1rem;
      font-weight: 600;
      cursor: pointer;
      color: white;
      background: var(--accent-2);
      transition: transform 150ms ease;
    }

    button:active {
      transform: scale(0.97);
    }

    button:disabled {
      opacity: 0.4;
      cursor: default;
    }

    .markers {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(150px, 1fr));
      gap: 12px;
    }

    .marker {
      min-height: 72px;
      border-radius: 18px;
      display: grid;
      gap: 4px;
      text-shadow: 0 1px 2px rgba(0, 0, 0, 0.35);
    }

    .marker .count {
      font-size: 1.5rem;
    }

    .total {
      font-size: 1.2rem;
      font-weight: 600;
    }

    .keypad {
      display: grid;
      grid-template-columns: repeat(3, 56px);
      gap: 8px;
    }

    .keypad button {
      padding: 12px 0;
      border-radius: 14px;
    }

    .camera {
      font-size: 1.3rem;
      font-weight: 600;
      min-width: 5ch;
    }

    .log {
      list-style: none;
      margin: 0;
      padding: 0;
      max-height: 220px;
      overflow-y: auto;
      display: grid;
      gap: 4px;
      font-size: 0.95rem;
    }

    .banner {
      display: none;
      justify-content: space-between;
      align-items: center;
      gap: 12px;
      background: #fde8e5;
      color: var(--danger);
      border-radius: 14px;
      padding: 12px 16px;
    }

    .banner[data-visible="true"] {
      display: flex;
    }

    .banner button {
      background: var(--danger);
      padding: 6px 12px;
    }

    .hidden {
      display: none;
    }

    .hint {
      margin: 0;
      color: #6f6a65;
      font-size: 0.9rem;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Timed Counter</h1>
      <span class="clock" id="clock">--:--:--</span>
    </header>

    <div class="banner" id="banner" data-visible="false">
      <span id="banner-text"></span>
      <button type="button" id="banner-dismiss">Dismiss</button>
    </div>

    <section class="card" id="start-card">
      <h2>Start</h2>
      <form class="row" id="start-form">
        <input id="owner" placeholder="Owner ID" autocomplete="off" />
        <input id="reference" placeholder="Current time, e.g. 9:00" autocomplete="off" />
        <button type="submit">Set</button>
      </form>
    </section>

    <section class="card hidden" id="owner-card">
      <span>Counting as <strong id="owner-label"></strong></span>
    </section>

    <section class="card">
      <div class="row" style="justify-content: space-between; margin-bottom: 12px;">
        <span class="total">Total: <span id="total">0</span></span>
        <button type="button" id="undo" disabled>Undo</button>
      </div>
      <div class="markers" id="markers"></div>
    </section>

    <section class="card">
      <h2>Comment</h2>
      <textarea id="comment" placeholder="What happened?"></textarea>
      <div class="row" style="margin-top: 12px; align-items: flex-start;">
        <div class="keypad" id="keypad"></div>
        <div style="display: grid; gap: 10px;">
          <span>Camera <span class="camera" id="camera">-</span></span>
          <button type="button" id="comment-submit">Add comment</button>
        </div>
      </div>
    </section>

    <section class="card">
      <h2>This session</h2>
      <ul class="log" id="log"></ul>
    </section>

    <div class="row">
      <button type="button" id="download">Download database</button>
    </div>
    <p class="hint">Counts cover today and are refreshed from the database every few seconds.</p>
  </main>

  <script>
    const SESSION = '{{SESSION_ID}}';
    const EXPORT_FILE = '{{EXPORT_FILE}}';
    const api = (path) => `/api/sessions/${SESSION}${path}`;

    const clockEl = document.getElementById('clock');
    const bannerEl = document.getElementById('banner');
    const bannerTextEl = document.getElementById('banner-text');
    const startCard = document.getElementById('start-card');
    const ownerCard = document.getElementById('owner-card');
    const ownerLabel = document.getElementById('owner-label');
    const totalEl = document.getElementById('total');
    const undoBtn = document.getElementById('undo');
    const markersEl = document.getElementById('markers');
    const commentEl = document.getElementById('comment');
    const cameraEl = document.getElementById('camera');
    const keypadEl = document.getElementById('keypad');
    const logEl = document.getElementById('log');

    let offsetMs = null;
    let markerSignature = '';
    let localError = null;

    const showBanner = (message) => {
      bannerTextEl.textContent = message || '';
      bannerEl.dataset.visible = String(Boolean(message));
    };

    const renderMarkers = (markers) => {
      const signature = markers.map((m) => `${m.id}|${m.label}|${m.background}`).join(',');
      if (signature !== markerSignature) {
        markerSignature = signature;
        markersEl.innerHTML = '';
        markers.forEach((marker) => {
          const button = document.createElement('button');
          button.type = 'button';
          button.className = 'marker';
          button.style.background = marker.background;
          button.dataset.id = marker.id;
          button.innerHTML = '<span class="label"></span><span class="count"></span>';
          button.querySelector('.label').textContent = marker.label;
          button.addEventListener('click', () => {
            send('POST', `/markers/${encodeURIComponent(marker.id)}`);
          });
          markersEl.appendChild(button);
        });
      }
      markers.forEach((marker) => {
        const button = markersEl.querySelector(`[data-id="${CSS.escape(marker.id)}"]`);
        if (button) {
          button.querySelector('.count').textContent = marker.count;
        }
      });
    };

    const render = (view) => {
      offsetMs = view.offset_ms;
      startCard.classList.toggle('hidden', view.ready);
      ownerCard.classList.toggle('hidden', !view.ready);
      ownerLabel.textContent = view.owner_id;
      totalEl.textContent = view.total;
      undoBtn.disabled = !view.can_undo;
      cameraEl.textContent = view.camera_number_text || '-';
      renderMarkers(view.markers);

      logEl.innerHTML = '';
      view.log.forEach((entry) => {
        const item = document.createElement('li');
        item.textContent = `${entry.time}  ${entry.description}`;
        logEl.appendChild(item);
      });

      showBanner(view.error || localError);
    };

    const load = async () => {
      const res = await fetch(api(''));
      if (res.status === 404) {
        showBanner('This session has expired. Reload the page to start a new one.');
        return;
      }
      if (res.ok) {
        render(await res.json());
      }
    };

    const send = async (method, path, body) => {
      const res = await fetch(api(path), {
        method,
        headers: body ? { 'content-type': 'application/json' } : {},
        body: body ? JSON.stringify(body) : undefined
      });
      if (res.ok) {
        render(await res.json());
        return true;
      }
      await load();
      return false;
    };

    const tick = () => {
      clockEl.textContent = offsetMs === null
        ? '--:--:--'
        : new Date(Date.now() + offsetMs).toLocaleTimeString();
      requestAnimationFrame(tick);
    };

    document.getElementById('start-form').addEventListener('submit', (event) => {
      event.preventDefault();
      send('POST', '/start', {
        owner_id: document.getElementById('owner').value,
        reference_time: document.getElementById('reference').value
      });
    });

    undoBtn.addEventListener('click', () => send('POST', '/undo'));

    commentEl.addEventListener('change', () => {
      send('PUT', '/comment', { text: commentEl.value });
    });

    document.getElementById('comment-submit').addEventListener('click', async () => {
      if (await send('POST', '/comment', { text: commentEl.value })) {
        commentEl.value = '';
      }
    });

    ['1', '2', '3', '4', '5', '6', '7', '8', '9', 'clear', '0', 'back'].forEach((key) => {
      const button = document.createElement('button');
      button.type = 'button';
      button.textContent = key === 'back' ? '⌫' : key === 'clear' ? 'C' : key;
      button.addEventListener('click', () => send('POST', '/keypad', { key }));
      keypadEl.appendChild(button);
    });

    document.getElementById('banner-dismiss').addEventListener('click', () => {
      localError = null;
      send('DELETE', '/error');
    });

    document.getElementById('download').addEventListener('click', async () => {
      const res = await fetch('/download');
      if (!res.ok) {
        localError = `Download failed: ${await res.text()}`;
        showBanner(localError);
        return;
      }
      const url = URL.createObjectURL(await res.blob());
      const link = document.createElement('a');
      link.href = url;
      link.download = EXPORT_FILE;
      link.click();
      URL.revokeObjectURL(url);
    });

    load();
    setInterval(load, 1000);
    requestAnimationFrame(tick);
  </script>
</body>
</html>
"#;
