//! UI Routes - HTML pages for the i23d-studio web interface
//!
//! Single studio page with vanilla ES6+, no frameworks. The 3D preview is
//! delegated to the model-viewer web component.

use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::AppState;

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new().route("/", get(studio_page))
}

/// Studio page: upload, options, progress, preview, download, convert
async fn studio_page() -> impl IntoResponse {
    Html(
        r##"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>i23d - Image to 3D Studio</title>
    <script type="module" src="https://unpkg.com/@google/model-viewer/dist/model-viewer.min.js"></script>
    <style>
        body {
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 1100px;
            margin: 40px auto;
            padding: 20px;
            line-height: 1.6;
        }
        h1 {
            color: #333;
            border-bottom: 2px solid #0066cc;
            padding-bottom: 10px;
        }
        .controls {
            display: flex;
            gap: 30px;
            align-items: flex-start;
            margin: 20px 0;
        }
        .options label { display: block; }
        .button {
            display: inline-block;
            padding: 10px 20px;
            background: #0066cc;
            color: white;
            border: none;
            border-radius: 4px;
            cursor: pointer;
            font-size: 15px;
        }
        .button:hover { background: #0052a3; }
        .button:disabled { background: #999; cursor: default; }
        .progress-bar {
            width: 100%;
            height: 30px;
            background: #e0e0e0;
            border-radius: 4px;
            overflow: hidden;
            margin: 10px 0;
        }
        .progress-fill {
            height: 100%;
            width: 0%;
            background: #0066cc;
            transition: width 0.3s ease;
        }
        .compare {
            display: grid;
            grid-template-columns: 1fr 1fr;
            gap: 20px;
            margin: 20px 0;
        }
        .compare img {
            max-width: 100%;
            border-radius: 12px;
            background: #111;
        }
        model-viewer {
            width: 100%;
            height: 420px;
            background: #111;
            border-radius: 12px;
        }
        #error {
            color: #a00000;
            background: #ffecec;
            padding: 10px 16px;
            border-radius: 4px;
            display: none;
        }
        .downloads { margin-top: 20px; display: none; }
    </style>
</head>
<body>
    <h1>Image to 3D Studio</h1>

    <div class="controls">
        <div>
            <p><input type="file" id="image" accept="image/jpeg,image/png"></p>
            <button class="button" id="start">Start 3D generation</button>
        </div>
        <div class="options">
            <strong>Options</strong>
            <label><input type="checkbox" id="enable_pbr" checked> Enable PBR materials</label>
            <label><input type="checkbox" id="should_remesh" checked> Remesh</label>
            <label><input type="checkbox" id="should_texture" checked> Texture</label>
        </div>
    </div>

    <p id="error"></p>

    <div id="status">
        <p><strong>Status:</strong> <span id="state">idle</span></p>
        <div class="progress-bar"><div class="progress-fill" id="bar"></div></div>
        <p><strong>Current operation:</strong> <span id="operation">-</span></p>
    </div>

    <div class="compare">
        <div>
            <h2>Source image</h2>
            <img id="source-preview" alt="Source image" hidden>
        </div>
        <div>
            <h2>Generated model</h2>
            <model-viewer id="viewer" alt="Generated 3D model"
                          auto-rotate camera-controls ar></model-viewer>
        </div>
    </div>

    <div class="downloads" id="downloads">
        <h2>Download</h2>
        <a class="button" id="download-glb" download="model.glb">Download GLB</a>
        <span style="margin: 0 10px;">or convert:</span>
        <select id="format">
            <option value="obj">OBJ</option>
            <option value="ply">PLY</option>
            <option value="stl">STL</option>
        </select>
        <button class="button" id="convert">Convert &amp; download</button>
    </div>

    <p><small>i23d-studio v0.1.0 | Port 5730 | <a href="/health">health</a></small></p>

    <script>
        const el = (id) => document.getElementById(id);
        let sessionId = null;
        let events = null;

        function showError(message) {
            el('error').textContent = message;
            el('error').style.display = message ? 'block' : 'none';
        }

        function setProgress(state, percent, message) {
            el('state').textContent = state;
            el('bar').style.width = percent + '%';
            el('operation').textContent = message;
        }

        function connectEvents() {
            if (events) events.close();
            events = new EventSource('/generate/events');
            events.addEventListener('GenerationProgress', (e) => {
                const data = JSON.parse(e.data);
                if (data.session_id !== sessionId) return;
                setProgress(data.state, data.percent, data.message);
            });
            events.addEventListener('GenerationFailed', (e) => {
                const data = JSON.parse(e.data);
                if (data.session_id !== sessionId) return;
                showError(data.message);
                setProgress('failed', 0, data.message);
                el('start').disabled = false;
            });
            events.addEventListener('AssetReady', (e) => {
                const data = JSON.parse(e.data);
                if (data.session_id !== sessionId) return;
                onAssetReady();
            });
        }

        function onAssetReady() {
            const assetUrl = '/generate/asset/' + sessionId;
            el('viewer').src = assetUrl;
            el('download-glb').href = assetUrl;
            el('downloads').style.display = 'block';
            el('start').disabled = false;
        }

        el('image').addEventListener('change', () => {
            const file = el('image').files[0];
            if (!file) return;
            el('source-preview').src = URL.createObjectURL(file);
            el('source-preview').hidden = false;
        });

        el('start').addEventListener('click', async () => {
            showError('');
            const file = el('image').files[0];
            if (!file) {
                showError('Please choose an image first.');
                return;
            }

            const form = new FormData();
            form.append('image', file);
            for (const flag of ['enable_pbr', 'should_remesh', 'should_texture']) {
                form.append(flag, el(flag).checked ? 'true' : 'false');
            }

            el('start').disabled = true;
            setProgress('submitting', 0, 'Creating generation task...');

            const response = await fetch('/generate/start', { method: 'POST', body: form });
            const body = await response.json();
            if (!response.ok) {
                showError(body.error ? body.error.message : 'Submission failed');
                setProgress('idle', 0, '-');
                el('start').disabled = false;
                return;
            }

            sessionId = body.session_id;
            sessionStorage.setItem('i23d-session', sessionId);
            el('downloads').style.display = 'none';
            connectEvents();
        });

        el('convert').addEventListener('click', async () => {
            showError('');
            const format = el('format').value;
            const response = await fetch('/generate/convert/' + sessionId, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ format }),
            });
            if (!response.ok) {
                const body = await response.json();
                showError(body.error ? body.error.message : 'Conversion failed');
                return;
            }
            const blob = await response.blob();
            const link = document.createElement('a');
            link.href = URL.createObjectURL(blob);
            link.download = 'model.' + format;
            link.click();
            URL.revokeObjectURL(link.href);
        });

        // Reconnect to an existing session after a page reload
        window.addEventListener('load', async () => {
            const saved = sessionStorage.getItem('i23d-session');
            if (!saved) return;
            const response = await fetch('/generate/status/' + saved);
            if (!response.ok) {
                sessionStorage.removeItem('i23d-session');
                return;
            }
            const status = await response.json();
            sessionId = saved;
            el('source-preview').src = '/generate/image/' + sessionId;
            el('source-preview').hidden = false;
            setProgress(status.state, status.percent, status.message);
            if (status.error) showError(status.error);
            if (status.asset_ready) {
                onAssetReady();
            } else if (status.state === 'estimating' || status.state === 'finalizing') {
                el('start').disabled = true;
                connectEvents();
            }
        });
    </script>
</body>
</html>
        "##,
    )
}
